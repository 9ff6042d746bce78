use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eyebreak_core::{
    Collaborators, CountdownScheduler, InterruptionDisplay, SchedulerState, StatusSurface,
};
use tokio::sync::mpsc;
use tokio::time;

const MINUTE: Duration = Duration::from_secs(60);
const BREAK_INTERVAL: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
struct Label(Mutex<Vec<String>>);

impl StatusSurface for Label {
    fn set_label(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

/// Display that stays open until the test closes it.
#[derive(Default)]
struct ManualDisplay {
    pending: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
    opened: Mutex<usize>,
}

impl ManualDisplay {
    fn dismiss(&self) {
        let on_closed = self.pending.lock().unwrap().take();
        on_closed.expect("display is not open")();
    }
}

impl InterruptionDisplay for ManualDisplay {
    fn open(&self, on_closed: Box<dyn FnOnce() + Send + 'static>) {
        *self.opened.lock().unwrap() += 1;
        *self.pending.lock().unwrap() = Some(on_closed);
    }
}

enum Event {
    Fired(Option<String>),
    Closed,
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn twenty_minute_countdown_ticks_every_minute_then_fires_once() {
    let label = Arc::new(Label::default());
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let fires = Arc::new(Mutex::new(0usize));

    let tick_sink = ticks.clone();
    let tick_label = label.clone();
    let fire_sink = fires.clone();
    let scheduler = CountdownScheduler::builder(BREAK_INTERVAL)
        .on_fire(move |_| *fire_sink.lock().unwrap() += 1)
        .interval(MINUTE, move |left| {
            tick_sink.lock().unwrap().push(left);
            tick_label.set_label(&left.to_string());
        })
        .collaborators(Collaborators {
            status: label.clone(),
            ..Collaborators::default()
        })
        .build()
        .unwrap();

    scheduler.start();
    assert_eq!(*ticks.lock().unwrap(), vec![20]);

    for _ in 0..19 {
        time::advance(MINUTE).await;
        settle().await;
    }
    let expected: Vec<i64> = (1..=20).rev().collect();
    assert_eq!(*ticks.lock().unwrap(), expected);
    assert_eq!(*fires.lock().unwrap(), 0);

    time::advance(MINUTE).await;
    settle().await;
    assert_eq!(*fires.lock().unwrap(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Fired);

    // the reporter may or may not have reported 0 at the deadline, never more
    let after_fire = ticks.lock().unwrap().len();
    assert!(after_fire == 20 || after_fire == 21);
    if after_fire == 21 {
        assert_eq!(ticks.lock().unwrap()[20], 0);
    }

    for _ in 0..5 {
        time::advance(MINUTE).await;
        settle().await;
    }
    assert_eq!(ticks.lock().unwrap().len(), after_fire);
    assert_eq!(*fires.lock().unwrap(), 1);

    // the break started with the label cleared
    assert_eq!(label.0.lock().unwrap().last().map(String::as_str), Some(""));
}

#[tokio::test(start_paused = true)]
async fn break_cycle_restarts_only_while_enabled() {
    let display = Arc::new(ManualDisplay::default());
    let enabled = Arc::new(AtomicBool::new(true));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let fire_tx = tx.clone();
    let scheduler = CountdownScheduler::builder(BREAK_INTERVAL)
        .on_fire(move |fg| {
            let _ = fire_tx.send(Event::Fired(fg));
        })
        .build()
        .unwrap();
    scheduler.start();

    // two full cycles, then pause while the break is shown
    for cycle in 0..3 {
        time::advance(BREAK_INTERVAL).await;
        settle().await;

        let Ok(Event::Fired(fg)) = rx.try_recv() else {
            panic!("cycle {cycle}: expected a fire event");
        };
        assert_eq!(fg, None);
        scheduler.stop();
        let close_tx = tx.clone();
        display.open(Box::new(move || {
            let _ = close_tx.send(Event::Closed);
        }));

        // nothing fires while the break is displayed
        time::advance(BREAK_INTERVAL * 2).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        if cycle == 2 {
            enabled.store(false, Ordering::SeqCst);
        }
        display.dismiss();
        let Ok(Event::Closed) = rx.try_recv() else {
            panic!("cycle {cycle}: expected a close event");
        };
        scheduler.stop();
        if enabled.load(Ordering::SeqCst) {
            scheduler.start();
        }
    }

    assert_eq!(*display.opened.lock().unwrap(), 3);
    assert!(!scheduler.running());
    time::advance(BREAK_INTERVAL * 2).await;
    settle().await;
    assert!(rx.try_recv().is_err());
}
