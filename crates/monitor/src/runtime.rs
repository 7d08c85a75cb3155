//! Monitoring event loop
//!
//! Three timers and the input channel share one task. Each handler runs to
//! completion before the next one starts, so session state needs no locks.
//! Telemetry pushes are spawned and never awaited by the loop. The upstream
//! session is opened before the first tick and closed after the final push.

use alerting::{NotificationGate, Notifier};
use camera_capture::{FrameSource, VideoFrame};
use cloud_sync::{ReportSummary, TelemetrySink};
use emotion::{EmotionClassifier, EmotionProvider, EmotionReading};
use face_mesh::LandmarkProvider;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wellness::breathing::{phase_at, BreathPhase};
use wellness::{FrameAnalysis, SessionSnapshot, WellnessEngine};

use crate::input::InputEvent;

/// Outcome of one frame tick
#[derive(Debug)]
pub enum FrameStep {
    Processed(FrameAnalysis),
    /// Source or landmark failure; the frame was dropped
    Skipped,
    /// The source has no more frames
    Ended,
}

/// Totals at the end of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub notifications: usize,
    pub snapshot: SessionSnapshot,
    /// Report from the server, when the transport produces one
    pub report: Option<ReportSummary>,
}

/// Timer periods
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub frame: Duration,
    pub telemetry: Duration,
}

struct Breathing {
    started: Instant,
    phase: BreathPhase,
}

/// The monitor: owns every collaborator and the session
pub struct Monitor<S, L, E, N, T>
where
    S: FrameSource,
    L: LandmarkProvider,
    E: EmotionProvider,
    N: Notifier,
    T: TelemetrySink,
{
    source: S,
    landmarks: L,
    engine: WellnessEngine,
    gate: NotificationGate<N>,
    emotion: EmotionClassifier<E>,
    sink: Arc<T>,
    schedule: Schedule,
    last_frame: Option<VideoFrame>,
    frames: u64,
    breathing: Option<Breathing>,
}

impl<S, L, E, N, T> Monitor<S, L, E, N, T>
where
    S: FrameSource,
    L: LandmarkProvider,
    E: EmotionProvider,
    N: Notifier,
    T: TelemetrySink + Send + Sync + 'static,
{
    pub fn new(
        source: S,
        landmarks: L,
        engine: WellnessEngine,
        gate: NotificationGate<N>,
        emotion: EmotionClassifier<E>,
        sink: T,
        schedule: Schedule,
    ) -> Self {
        Self {
            source,
            landmarks,
            engine,
            gate,
            emotion,
            sink: Arc::new(sink),
            schedule,
            last_frame: None,
            frames: 0,
            breathing: None,
        }
    }

    /// Pull one frame and run it through the landmark model and the engine
    pub fn step_frame(&mut self, now: Instant) -> FrameStep {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameStep::Ended,
            Err(e) => {
                warn!("Frame dropped: {}", e);
                return FrameStep::Skipped;
            }
        };

        let face = match self.landmarks.process(&frame) {
            Ok(face) => face,
            Err(e) => {
                warn!("Landmark detection failed on frame {}: {}", frame.sequence, e);
                return FrameStep::Skipped;
            }
        };

        let analysis = self.engine.process_frame(&frame, face.as_ref(), now);
        self.frames += 1;
        metrics::counter!("wellness_frames_total").increment(1);
        if let Some(ear) = &analysis.ear {
            metrics::gauge!("wellness_current_ear").set(ear.mean);
        }
        if analysis.blinked() {
            metrics::counter!("wellness_blinks_total").increment(1);
        }

        for alert in &analysis.raised {
            metrics::counter!("wellness_alerts_total", "kind" => alert.as_str()).increment(1);
            let outcome = self.gate.notify_at(alert.as_str(), alert.title(), alert.message(), now);
            metrics::counter!("wellness_notifications_total", "outcome" => outcome.as_str()).increment(1);
        }

        self.update_breathing(now);
        self.last_frame = Some(frame);
        FrameStep::Processed(analysis)
    }

    /// One emotion poll against the latest frame
    pub fn poll_emotion(&mut self) -> Option<EmotionReading> {
        let reading = self
            .emotion
            .tick(self.last_frame.as_ref(), self.source.is_active())?;
        self.engine.session_mut().set_emotion(reading.label.clone());
        Some(reading)
    }

    /// Current telemetry payload
    pub fn snapshot(&self) -> SessionSnapshot {
        self.engine.snapshot()
    }

    /// Push a snapshot in the background; failures are logged and dropped
    pub fn push_telemetry(&self) {
        let sink = Arc::clone(&self.sink);
        let snapshot = self.snapshot();
        tokio::spawn(async move {
            match sink.publish(snapshot).await {
                Ok(()) => {
                    metrics::counter!("wellness_telemetry_total", "outcome" => "ok").increment(1);
                }
                Err(e) => {
                    metrics::counter!("wellness_telemetry_total", "outcome" => "failed").increment(1);
                    warn!("Telemetry push failed: {}", e);
                }
            }
        });
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::KeyPress => self.engine.session_mut().input.record_key_press(),
            InputEvent::Pointer { x, y } => self.engine.session_mut().input.record_pointer(x, y),
            InputEvent::ToggleBreathing => {
                if self.breathing.take().is_some() {
                    info!("Breathing routine stopped");
                } else {
                    let phase = phase_at(Duration::ZERO);
                    info!(target: "breathing", "{}", phase.prompt());
                    self.breathing = Some(Breathing { started: now, phase });
                }
            }
        }
    }

    fn update_breathing(&mut self, now: Instant) {
        if let Some(breathing) = &mut self.breathing {
            let phase = phase_at(now.saturating_duration_since(breathing.started));
            if phase != breathing.phase {
                breathing.phase = phase;
                info!(target: "breathing", "{}", phase.prompt());
            }
        }
    }

    pub fn breathing_phase(&self) -> Option<BreathPhase> {
        self.breathing.as_ref().map(|b| b.phase)
    }

    pub fn engine(&self) -> &WellnessEngine {
        &self.engine
    }

    pub fn gate(&self) -> &NotificationGate<N> {
        &self.gate
    }

    pub fn emotion_label(&self) -> &str {
        self.emotion.label()
    }

    /// Run until the source ends or `shutdown` resolves
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<InputEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> RunSummary {
        match self.sink.open_session().await {
            Ok(Some(id)) => info!("Upstream session {} opened", id),
            Ok(None) => {}
            Err(e) => warn!("Could not open upstream session: {}", e),
        }

        let mut frame_timer = tokio::time::interval(self.schedule.frame);
        // a slow model drops frames instead of queueing them
        frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut emotion_timer = self.emotion.interval();
        let mut telemetry_timer = tokio::time::interval_at(
            tokio::time::Instant::now() + self.schedule.telemetry,
            self.schedule.telemetry,
        );
        telemetry_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut inputs_open = true;
        tokio::pin!(shutdown);

        info!(
            "Monitoring started (frame every {:?}, telemetry every {:?})",
            self.schedule.frame, self.schedule.telemetry
        );

        loop {
            tokio::select! {
                _ = frame_timer.tick() => {
                    if let FrameStep::Ended = self.step_frame(Instant::now()) {
                        info!("Frame source ended after {} frames", self.frames);
                        break;
                    }
                }
                _ = emotion_timer.tick() => {
                    if let Some(reading) = self.poll_emotion() {
                        debug!("Emotion {} ({})", reading.label, reading.severity.as_str());
                    }
                }
                _ = telemetry_timer.tick() => {
                    self.push_telemetry();
                }
                event = inputs.recv(), if inputs_open => match event {
                    Some(event) => self.handle_input(event, Instant::now()),
                    None => inputs_open = false,
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        let snapshot = self.snapshot();
        if let Err(e) = self.sink.publish(snapshot.clone()).await {
            warn!("Final telemetry push failed: {}", e);
        }
        let report = match self.sink.close_session().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Could not close upstream session: {}", e);
                None
            }
        };

        RunSummary {
            frames: self.frames,
            notifications: self.gate.fired_count(),
            snapshot,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertConfig, MemoryNotifier, NotificationGate};
    use camera_capture::{CameraConfig, SyntheticCamera};
    use cloud_sync::MemorySink;
    use emotion::{Expressions, ScriptedEmotionProvider};
    use face_mesh::{FixedLandmarkProvider, SyntheticFace};
    use wellness::{WellnessAlert, WellnessConfig};

    type TestMonitor =
        Monitor<SyntheticCamera, FixedLandmarkProvider, ScriptedEmotionProvider, MemoryNotifier, MemorySink>;

    fn camera(limit: u32) -> SyntheticCamera {
        SyntheticCamera::new(CameraConfig { width: 64, height: 48, fps: 30 }).with_frame_limit(limit)
    }

    fn monitor(
        camera: SyntheticCamera,
        face: SyntheticFace,
        emotions: ScriptedEmotionProvider,
        sink: MemorySink,
    ) -> (TestMonitor, MemoryNotifier) {
        let notifier = MemoryNotifier::granted();
        let mut gate = NotificationGate::new(AlertConfig::default(), notifier.clone());
        gate.request_permission();

        let monitor = Monitor::new(
            camera,
            FixedLandmarkProvider::new(Some(face.build())),
            WellnessEngine::new(WellnessConfig::default()).unwrap(),
            gate,
            EmotionClassifier::new(emotions),
            sink,
            Schedule {
                frame: Duration::from_millis(33),
                telemetry: Duration::from_secs(4),
            },
        );
        (monitor, notifier)
    }

    #[test]
    fn test_blink_cycle_through_pipeline() {
        let (mut monitor, _) = monitor(
            camera(10),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        let now = Instant::now();

        for ear in [0.30, 0.20, 0.20, 0.31] {
            monitor.landmarks.set_face(Some(SyntheticFace::default().with_ear(ear).build()));
            assert!(matches!(monitor.step_frame(now), FrameStep::Processed(_)));
        }
        assert_eq!(monitor.snapshot().blinks, 1);
        assert!((monitor.snapshot().current_ear - 0.31).abs() < 1e-9);
    }

    #[test]
    fn test_alerts_pass_through_cooldown() {
        let mut camera = camera(100);
        camera.set_brightness(128);
        let (mut monitor, notifier) = monitor(
            camera,
            SyntheticFace::default().with_nose_y(0.8).with_face_width(0.5),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        let t0 = Instant::now();

        let FrameStep::Processed(analysis) = monitor.step_frame(t0) else {
            panic!("frame not processed");
        };
        assert_eq!(analysis.raised, vec![WellnessAlert::Posture, WellnessAlert::Distance]);

        // global cooldown: one notification for both kinds
        monitor.step_frame(t0 + Duration::from_secs(5));
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, "Poor Posture Detected");

        monitor.step_frame(t0 + Duration::from_secs(16));
        assert_eq!(monitor.gate().fired_count(), 2);
    }

    #[test]
    fn test_source_end() {
        let (mut monitor, _) = monitor(
            camera(1),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        assert!(matches!(monitor.step_frame(Instant::now()), FrameStep::Processed(_)));
        assert!(matches!(monitor.step_frame(Instant::now()), FrameStep::Ended));
    }

    #[test]
    fn test_emotion_poll_updates_session() {
        let emotions = ScriptedEmotionProvider::new()
            .push(Expressions::from_pairs([("happy", 0.3), ("sad", 0.3), ("angry", 0.2)]));
        let (mut monitor, _) = monitor(camera(10), SyntheticFace::default(), emotions, MemorySink::new());

        // no frame yet
        assert!(monitor.poll_emotion().is_none());
        monitor.step_frame(Instant::now());
        let reading = monitor.poll_emotion().unwrap();
        assert_eq!(reading.label, "Happy");
        assert_eq!(monitor.snapshot().emotion, "Happy");
        assert_eq!(monitor.emotion_label(), "Happy");
    }

    #[test]
    fn test_input_events() {
        let (mut monitor, _) = monitor(
            camera(10),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        let now = Instant::now();
        monitor.handle_input(InputEvent::KeyPress, now);
        monitor.handle_input(InputEvent::KeyPress, now);
        monitor.handle_input(InputEvent::Pointer { x: 0.0, y: 0.0 }, now);
        monitor.handle_input(InputEvent::Pointer { x: 3.0, y: 4.0 }, now);
        monitor.handle_input(InputEvent::Pointer { x: 3.0, y: 4.6 }, now);
        monitor.handle_input(InputEvent::Pointer { x: f64::NAN, y: 0.0 }, now);
        monitor.handle_input(InputEvent::Pointer { x: 3.0, y: f64::INFINITY }, now);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.keys, 2);
        assert_eq!(snapshot.mouse, 6);
    }

    #[test]
    fn test_breathing_routine() {
        let (mut monitor, _) = monitor(
            camera(10),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        let t0 = Instant::now();
        monitor.handle_input(InputEvent::ToggleBreathing, t0);
        assert_eq!(monitor.breathing_phase(), Some(BreathPhase::Inhale));

        monitor.step_frame(t0 + Duration::from_secs(5));
        assert_eq!(monitor.breathing_phase(), Some(BreathPhase::Hold));
        monitor.step_frame(t0 + Duration::from_secs(7));
        assert_eq!(monitor.breathing_phase(), Some(BreathPhase::Exhale));

        monitor.handle_input(InputEvent::ToggleBreathing, t0);
        assert_eq!(monitor.breathing_phase(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_pushes_telemetry() {
        let sink = MemorySink::new();
        // 10 s of frames at 30 fps
        let (monitor, _) = monitor(
            camera(300),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            sink.clone(),
        );
        let (tx, rx) = mpsc::channel(8);
        tx.send(InputEvent::KeyPress).await.unwrap();

        let summary = monitor.run(rx, std::future::pending()).await;
        tokio::task::yield_now().await;

        assert_eq!(summary.frames, 300);
        assert_eq!(summary.snapshot.keys, 1);
        let published = sink.published();
        // two periodic pushes (4 s, 8 s) and the final one
        assert_eq!(published.len(), 3);
        assert_eq!(published.last(), Some(&summary.snapshot));
        assert_eq!(sink.sessions_opened(), 1);
        assert_eq!(sink.sessions_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_telemetry_does_not_stop_monitoring() {
        let (monitor, _) = monitor(
            camera(300),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::failing(),
        );
        let (_tx, rx) = mpsc::channel(8);
        let summary = monitor.run(rx, std::future::pending()).await;
        assert_eq!(summary.frames, 300);
        assert!(summary.report.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown() {
        let (monitor, _) = monitor(
            SyntheticCamera::new(CameraConfig::default()),
            SyntheticFace::default(),
            ScriptedEmotionProvider::new(),
            MemorySink::new(),
        );
        let (_tx, rx) = mpsc::channel(8);
        let summary = monitor
            .run(rx, tokio::time::sleep(Duration::from_secs(1)))
            .await;
        assert!(summary.frames > 0);
    }
}
