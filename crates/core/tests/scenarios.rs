use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use doubleclock_core::{
    AppConfig, BuzzPattern, BuzzerOutput, ClockId, DeviceController, DeviceSnapshot, DeviceState,
    DigitValue, DisplayDriver, Hardware, InputEvent, InputSource, JsonFileStore, MemoryStore,
    PersistenceStore, Presenter, SharedBuzzer,
};

#[derive(Clone, Default)]
struct RecordingDisplay {
    shown: Arc<Mutex<Vec<(ClockId, String, bool)>>>,
}

impl DisplayDriver for RecordingDisplay {
    fn set_brightness(&mut self, _clock: ClockId, _level: u8) {}

    fn show_digits(&mut self, clock: ClockId, text: &str, colon: bool) {
        self.shown
            .lock()
            .unwrap()
            .push((clock, text.to_string(), colon));
    }
}

#[derive(Default)]
struct RecordingBuzzer {
    levels: Vec<bool>,
}

impl BuzzerOutput for RecordingBuzzer {
    fn set_on(&mut self, on: bool) {
        self.levels.push(on);
    }
}

struct Slider;

impl InputSource for Slider {
    fn slider_level(&self) -> bool {
        false
    }
}

struct Rig {
    controller: DeviceController,
    display: RecordingDisplay,
    buzzer: Arc<Mutex<RecordingBuzzer>>,
}

fn rig(store: Box<dyn PersistenceStore>, tick_ms: u64) -> Rig {
    let mut config = AppConfig::default();
    config.timing.tick_ms = tick_ms;
    config.timing.frame_ms = 5;

    let display = RecordingDisplay::default();
    let buzzer = Arc::new(Mutex::new(RecordingBuzzer::default()));
    let output: SharedBuzzer = buzzer.clone();
    let hardware = Hardware {
        display: Box::new(display.clone()),
        buzzer: output,
        store,
    };
    let controller = DeviceController::start(&config, hardware, &Slider).unwrap();
    Rig {
        controller,
        display,
        buzzer,
    }
}

/// Rig whose countdown only advances through `run_tick`.
fn manual_rig(left_seconds: u8, right_seconds: u8) -> Rig {
    let store = MemoryStore::new();
    store.save(&[
        DigitValue::from_minutes_seconds(0, left_seconds).unwrap(),
        DigitValue::from_minutes_seconds(0, right_seconds).unwrap(),
    ]);
    rig(Box::new(store), 3_600_000)
}

fn press(controller: &DeviceController, events: &[InputEvent]) {
    for event in events {
        controller.dispatch(*event).unwrap();
    }
}

fn start_countdown(controller: &DeviceController) {
    press(
        controller,
        &[InputEvent::Push, InputEvent::Push, InputEvent::Start],
    );
    assert_eq!(controller.state().unwrap(), DeviceState::Running);
}

fn ticks(controller: &DeviceController, count: usize) {
    for _ in 0..count {
        controller.run_tick().unwrap();
    }
}

fn wait_for(controller: &DeviceController, what: impl Fn(&DeviceSnapshot) -> bool) -> DeviceSnapshot {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = controller.snapshot().unwrap();
        if what(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out in {snapshot:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn left_five_seconds_right_zero() {
    let rig = manual_rig(5, 0);
    let controller = &rig.controller;
    start_countdown(controller);

    ticks(controller, 4);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.state, DeviceState::Running);
    assert_eq!(snapshot.remaining, [1, 0]);
    assert_eq!(controller.active_buzz(), None);

    ticks(controller, 1);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.state, DeviceState::Alarm);
    assert_eq!(snapshot.remaining, [0, 0]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_LEFT));

    ticks(controller, 3);
    assert_eq!(controller.snapshot().unwrap().remaining, [-3, 0]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_LEFT));
}

#[test]
fn simultaneous_zero_plays_left_alarm_only() {
    let rig = manual_rig(3, 3);
    let controller = &rig.controller;
    start_countdown(controller);

    ticks(controller, 3);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.state, DeviceState::Alarm);
    assert_eq!(snapshot.remaining, [0, 0]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_LEFT));

    press(controller, &[InputEvent::Start]);
    assert_eq!(controller.state().unwrap(), DeviceState::Ready);
    assert_eq!(controller.active_buzz(), None);
    assert_eq!(rig.buzzer.lock().unwrap().levels.last(), Some(&false));
}

#[test]
fn same_tick_crossing_cuts_off_a_warning() {
    let rig = manual_rig(2, 2);
    let controller = &rig.controller;
    start_countdown(controller);

    ticks(controller, 1);
    press(controller, &[InputEvent::Up]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::WARNING));

    ticks(controller, 1);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.state, DeviceState::Alarm);
    assert_eq!(snapshot.remaining, [0, 0]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_LEFT));

    // Warning on, warning switched off by the replacement, alarm on.
    let deadline = Instant::now() + Duration::from_secs(5);
    while rig.buzzer.lock().unwrap().levels.len() < 3 {
        assert!(Instant::now() < deadline, "alarm never switched the buzzer on");
        thread::sleep(Duration::from_millis(2));
    }
    let levels = rig.buzzer.lock().unwrap().levels.clone();
    assert_eq!(&levels[..3], &[true, false, true]);

    press(controller, &[InputEvent::Start]);
    assert_eq!(controller.state().unwrap(), DeviceState::Ready);
    assert_eq!(controller.active_buzz(), None);
}

#[test]
fn later_crossing_replaces_the_running_alarm() {
    let rig = manual_rig(2, 4);
    let controller = &rig.controller;
    start_countdown(controller);

    ticks(controller, 2);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_LEFT));
    ticks(controller, 2);
    assert_eq!(controller.state().unwrap(), DeviceState::Alarm);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_RIGHT));
}

#[test]
fn acknowledged_clock_runs_into_overtime() {
    let rig = manual_rig(2, 10);
    let controller = &rig.controller;
    start_countdown(controller);

    ticks(controller, 2);
    assert_eq!(controller.state().unwrap(), DeviceState::Alarm);
    press(controller, &[InputEvent::Start]);
    assert_eq!(controller.state().unwrap(), DeviceState::Running);
    assert_eq!(controller.active_buzz(), None);

    ticks(controller, 5);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.remaining, [-5, 3]);

    let frame = Presenter::new().frame(&snapshot);
    assert_eq!(frame[0].text(), "0005");
    assert_eq!(frame[1].text(), "0003");

    ticks(controller, 3);
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.state, DeviceState::Alarm);
    assert_eq!(snapshot.remaining, [-8, 0]);
    assert_eq!(controller.active_buzz(), Some(BuzzPattern::ALARM_RIGHT));

    press(controller, &[InputEvent::Start]);
    assert_eq!(controller.state().unwrap(), DeviceState::Ready);
    assert_eq!(controller.active_buzz(), None);
}

#[test]
fn values_survive_a_restart() {
    let path = std::env::temp_dir().join(format!("doubleclock-restart-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let first = rig(Box::new(JsonFileStore::new(&path)), 3_600_000);
    press(
        &first.controller,
        &[
            InputEvent::Push,
            InputEvent::Up,
            InputEvent::Up,
            InputEvent::Left,
            InputEvent::Down,
            InputEvent::Push,
        ],
    );
    let saved = first.controller.snapshot().unwrap().values;
    assert_eq!(saved[0].digits(), [2, 5, 0, 0]);
    first.controller.shutdown().unwrap();

    let restarted = rig(Box::new(JsonFileStore::new(&path)), 3_600_000);
    let restored = restarted.controller.snapshot().unwrap();
    assert_eq!(restored.state, DeviceState::Init);
    assert_eq!(restored.values, saved);
    let _ = std::fs::remove_file(path);
}

#[test]
fn stopped_countdown_stays_quiet() {
    let store = MemoryStore::new();
    store.save(&[DigitValue::from_minutes_seconds(0, 3).unwrap(), DigitValue::ZERO]);
    let rig = rig(Box::new(store), 20);
    let controller = &rig.controller;

    start_countdown(controller);
    press(controller, &[InputEvent::Start]);
    let stopped = controller.snapshot().unwrap();
    assert_eq!(stopped.state, DeviceState::Ready);

    thread::sleep(Duration::from_millis(150));
    let later = controller.snapshot().unwrap();
    assert_eq!(later.remaining, stopped.remaining);
    assert_eq!(later.state, DeviceState::Ready);
    assert_eq!(controller.active_buzz(), None);
}

#[test]
fn live_run_through_the_event_queue() {
    let store = MemoryStore::new();
    store.save(&[DigitValue::from_minutes_seconds(0, 2).unwrap(), DigitValue::ZERO]);
    let rig = rig(Box::new(store), 10);
    let controller = &rig.controller;
    let sender = controller.sender();

    sender.send(InputEvent::Push).unwrap();
    sender.send(InputEvent::Push).unwrap();
    sender.send(InputEvent::Start).unwrap();

    let alarm = wait_for(controller, |s| s.state == DeviceState::Alarm);
    assert!(alarm.remaining[0] <= 0);
    assert_eq!(alarm.remaining[1], 0);
    wait_for(controller, |s| s.remaining[0] <= -3);

    sender.send(InputEvent::Start).unwrap();
    wait_for(controller, |s| s.state == DeviceState::Ready);
    assert_eq!(controller.active_buzz(), None);

    rig.controller.shutdown().unwrap();
    let shown = rig.display.shown.lock().unwrap().clone();
    assert_eq!(
        &shown[shown.len() - 2..],
        &[
            (ClockId::Left, "    ".to_string(), false),
            (ClockId::Right, "    ".to_string(), false),
        ]
    );
    assert!(shown.iter().any(|(clock, text, _)| *clock == ClockId::Left && text == "0002"));
    assert_eq!(rig.buzzer.lock().unwrap().levels.last(), Some(&false));
}
