use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc, Mutex, MutexGuard, Weak,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, BuzzPattern, BuzzSequencer, CancelToken, ClockId, Countdown, CountdownEngine,
    DigitEditor, DigitValue, DisplayDriver, DoubleClockError, EventSender, InputEvent,
    InputSource, PersistenceStore, PresentationScheduler, Result, SharedBuzzer,
};

/// Operating state of the whole device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// Freshly started, showing the remembered values.
    Init,
    /// Editing digits.
    Setup,
    /// Values confirmed, waiting for start.
    Ready,
    Running,
    /// At least one clock reached zero and the alarm is unacknowledged.
    Alarm,
}

impl DeviceState {
    /// Whether the countdown is live in this state.
    pub fn is_counting(self) -> bool {
        matches!(self, DeviceState::Running | DeviceState::Alarm)
    }
}

/// Consistent copy of everything the displays need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub state: DeviceState,
    /// Configured value of each clock, indexed by [`ClockId::index`].
    pub values: [DigitValue; 2],
    /// Edit cursor of each clock.
    pub cursors: [usize; 2],
    /// Seconds left on each clock; negative in overtime.
    pub remaining: [i32; 2],
    /// Clock selected by the slider.
    pub active: ClockId,
}

/// External collaborators the controller drives.
pub struct Hardware {
    pub display: Box<dyn DisplayDriver>,
    pub buzzer: SharedBuzzer,
    pub store: Box<dyn PersistenceStore>,
}

struct Device {
    state: DeviceState,
    editor: DigitEditor,
    countdown: Countdown,
    active: ClockId,
    engine: CountdownEngine,
    store: Box<dyn PersistenceStore>,
}

impl Device {
    fn transition(&mut self, to: DeviceState) {
        if self.state != to {
            tracing::info!(from = ?self.state, to = ?to, "state change");
            self.state = to;
        }
    }

    fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            state: self.state,
            values: self.editor.values(),
            cursors: self.editor.cursors(),
            remaining: self.countdown.remaining_all(),
            active: self.active,
        }
    }
}

/// Everything the event loop, the countdown thread and the presentation
/// thread share. Each of them holds the device lock for the whole of its
/// work; buzzer threads never take it.
struct Shared {
    device: Mutex<Device>,
    buzzer: BuzzSequencer,
    tick: Duration,
}

impl Shared {
    fn lock_device(&self) -> Result<MutexGuard<'_, Device>> {
        self.device
            .lock()
            .map_err(|_| DoubleClockError::Poisoned("device state"))
    }

    fn dispatch(self: &Arc<Self>, event: InputEvent) -> Result<()> {
        let mut device = self.lock_device()?;
        tracing::debug!(?event, state = ?device.state, "input");
        match event {
            InputEvent::Push => self.on_push(&mut device),
            InputEvent::Left => self.edit(&mut device, DigitEditor::cursor_forward)?,
            InputEvent::Right => self.edit(&mut device, DigitEditor::cursor_back)?,
            InputEvent::Up => self.edit(&mut device, DigitEditor::increment)?,
            InputEvent::Down => self.edit(&mut device, DigitEditor::decrement)?,
            InputEvent::Start => self.on_start(&mut device)?,
            InputEvent::SliderChanged(high) => {
                device.active = ClockId::from_slider_level(high);
                tracing::debug!(active = ?device.active, "active clock");
            }
        }
        Ok(())
    }

    fn on_push(&self, device: &mut Device) {
        match device.state {
            DeviceState::Init => device.transition(DeviceState::Setup),
            DeviceState::Setup => {
                device.store.save(&device.editor.values());
                device.transition(DeviceState::Ready);
            }
            DeviceState::Ready => device.transition(DeviceState::Setup),
            DeviceState::Running | DeviceState::Alarm => {
                tracing::debug!("push ignored while counting");
            }
        }
    }

    fn edit(&self, device: &mut Device, op: fn(&mut DigitEditor, ClockId)) -> Result<()> {
        if device.state != DeviceState::Setup {
            self.buzzer.start(BuzzPattern::WARNING)?;
            return Ok(());
        }
        let clock = device.active;
        op(&mut device.editor, clock);
        tracing::debug!(
            ?clock,
            cursor = device.editor.cursor(clock),
            digit = device.editor.selected_digit(clock),
            "digit edit"
        );
        Ok(())
    }

    fn on_start(self: &Arc<Self>, device: &mut Device) -> Result<()> {
        match device.state {
            DeviceState::Init => {
                self.buzzer.start(BuzzPattern::WARNING)?;
            }
            DeviceState::Setup => {
                device.editor.reset_all();
                tracing::info!("digits reset");
            }
            DeviceState::Ready => {
                if device.editor.total_seconds() == 0 {
                    tracing::debug!("nothing to count down, start ignored");
                    return Ok(());
                }
                device.countdown.arm(&device.editor.values());
                let shared = Arc::downgrade(self);
                device
                    .engine
                    .start(self.tick, move |token| engine_tick(&shared, token))?;
                device.transition(DeviceState::Running);
            }
            DeviceState::Running => {
                device.engine.stop();
                device.transition(DeviceState::Ready);
            }
            DeviceState::Alarm => {
                self.buzzer.stop();
                if device.countdown.all_expired() {
                    device.engine.stop();
                    device.transition(DeviceState::Ready);
                } else {
                    device.transition(DeviceState::Running);
                }
            }
        }
        Ok(())
    }

    /// One countdown step: decrement, then sound the alarm for clocks that
    /// just reached zero. Only the first of several simultaneous crossings
    /// gets to start a pattern.
    fn advance(&self, device: &mut Device) -> Result<()> {
        if !device.state.is_counting() {
            return Ok(());
        }
        let crossings = device.countdown.tick();
        let mut sounding = false;
        for clock in crossings.iter() {
            tracing::info!(?clock, "countdown reached zero");
            device.transition(DeviceState::Alarm);
            if sounding {
                tracing::debug!(?clock, "alarm already raised this tick");
                continue;
            }
            self.buzzer.replace(BuzzPattern::alarm_for(clock))?;
            sounding = true;
        }
        Ok(())
    }
}

fn engine_tick(shared: &Weak<Shared>, token: &CancelToken) -> Result<()> {
    let shared = shared
        .upgrade()
        .ok_or_else(|| DoubleClockError::msg("controller is gone"))?;
    let mut device = shared.lock_device()?;
    // A stop requested while this tick waited for the lock wins.
    if token.is_cancelled() {
        return Ok(());
    }
    shared.advance(&mut device)
}

fn run_events(shared: Arc<Shared>, events: Receiver<InputEvent>, exit: CancelToken, poll: Duration) {
    while !exit.is_cancelled() {
        match events.recv_timeout(poll) {
            Ok(event) => {
                if let Err(err) = shared.dispatch(event) {
                    tracing::error!(%err, "event handling failed, stopping input");
                    shared.buzzer.stop();
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("event loop exited");
}

/// Top-level controller of the dual clock.
///
/// [`DeviceController::start`] spawns the event loop and the presentation
/// thread; the countdown thread exists while a countdown runs. Input arrives
/// either through the bounded queue behind [`DeviceController::sender`] or
/// synchronously through [`DeviceController::dispatch`].
pub struct DeviceController {
    shared: Arc<Shared>,
    sender: EventSender,
    exit: CancelToken,
    event_loop: Option<JoinHandle<()>>,
    presentation: Option<PresentationScheduler>,
}

impl DeviceController {
    /// Restores the remembered values, reads the slider and starts the
    /// background threads in state [`DeviceState::Init`].
    pub fn start(config: &AppConfig, hardware: Hardware, input: &dyn InputSource) -> Result<Self> {
        config.validate()?;
        let Hardware {
            display,
            buzzer,
            store,
        } = hardware;

        let values = store.load().unwrap_or_default();
        let device = Device {
            state: DeviceState::Init,
            editor: DigitEditor::with_values(values),
            countdown: Countdown::new(),
            active: ClockId::from_slider_level(input.slider_level()),
            engine: CountdownEngine::new(),
            store,
        };
        tracing::info!(?values, active = ?device.active, "controller starting");

        let shared = Arc::new(Shared {
            device: Mutex::new(device),
            buzzer: BuzzSequencer::new(buzzer),
            tick: config.timing.tick(),
        });

        let (tx, rx) = mpsc::sync_channel(config.input.queue_capacity.max(1));
        let exit = CancelToken::new();
        let event_loop = {
            let shared = Arc::clone(&shared);
            let exit = exit.clone();
            let poll = config.timing.frame();
            thread::Builder::new()
                .name("controller-events".to_string())
                .spawn(move || run_events(shared, rx, exit, poll))?
        };

        let presentation = {
            let shared = Arc::clone(&shared);
            PresentationScheduler::start(
                config.timing.frame(),
                config.display.brightness,
                display,
                move || Ok(shared.lock_device()?.snapshot()),
            )?
        };

        Ok(Self {
            shared,
            sender: EventSender::new(tx),
            exit,
            event_loop: Some(event_loop),
            presentation: Some(presentation),
        })
    }

    /// Handle for input callbacks. Sending never blocks.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Handles one event on the calling thread.
    pub fn dispatch(&self, event: InputEvent) -> Result<()> {
        self.shared.dispatch(event)
    }

    /// Performs one countdown step exactly as the countdown thread does.
    /// Does nothing outside Running and Alarm.
    pub fn run_tick(&self) -> Result<()> {
        let mut device = self.shared.lock_device()?;
        self.shared.advance(&mut device)
    }

    /// Copy of the current device state.
    pub fn snapshot(&self) -> Result<DeviceSnapshot> {
        Ok(self.shared.lock_device()?.snapshot())
    }

    /// Current operating state.
    pub fn state(&self) -> Result<DeviceState> {
        Ok(self.shared.lock_device()?.state)
    }

    /// Buzzer pattern that is currently playing.
    pub fn active_buzz(&self) -> Option<BuzzPattern> {
        self.shared.buzzer.active_pattern()
    }

    /// Stops every background thread, silences the buzzer and blanks the
    /// displays.
    pub fn shutdown(mut self) -> Result<()> {
        self.halt()
    }

    fn halt(&mut self) -> Result<()> {
        self.exit.cancel();
        if let Some(handle) = self.event_loop.take() {
            if handle.join().is_err() {
                tracing::error!("event loop panicked");
            }
        }

        let countdown_threads = {
            let mut device = self.shared.lock_device()?;
            device.engine.stop();
            device.engine.take_threads()
        };
        for handle in countdown_threads {
            if handle.join().is_err() {
                tracing::error!("countdown thread panicked");
            }
        }

        self.shared.buzzer.stop();
        if let Some(mut presentation) = self.presentation.take() {
            presentation.stop();
            tracing::info!("controller stopped");
        }
        Ok(())
    }
}

impl Drop for DeviceController {
    fn drop(&mut self) {
        if let Err(err) = self.halt() {
            tracing::error!(%err, "controller shutdown failed");
        }
    }
}

impl std::fmt::Debug for DeviceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceController").finish_non_exhaustive()
    }
}
