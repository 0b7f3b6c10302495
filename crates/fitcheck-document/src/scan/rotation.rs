// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotation race — scans all four orientation hypotheses of a page at once and
// keeps whichever attempt reaches a conclusive verdict first.
//
// Each attempt runs on tokio's blocking pool with its own OCR engine and its
// own `ClassifierState`. Results are consumed in completion order. Once one is
// accepted the shared `CancelFlag` is raised; siblings notice it before their
// next OCR call. The coordinator waits at most `shutdown_grace_ms` for them to
// wind down and then detaches whatever is still running.

use std::sync::Arc;
use std::time::Duration;

use fitcheck_core::error::{FitcheckError, Result};
use fitcheck_core::{Rotation, ScanConfig, SessionId, Verdict};
use image::DynamicImage;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, instrument, warn};

use super::classifier::ClassifierState;
use super::ocr::RecognizerFactory;
use super::scanner::{CancelFlag, RegionScanner};
use crate::filters::orient;

type AttemptResult = (Rotation, Result<ClassifierState>);

/// The accepted attempt: which orientation won and its final state.
///
/// On `SUCCESS` the state carries the re-oriented page image.
#[derive(Debug)]
pub struct RotationOutcome {
    pub rotation: Rotation,
    pub state: ClassifierState,
}

impl RotationOutcome {
    pub fn verdict(&self) -> Verdict {
        self.state.verdict()
    }
}

/// Races the four orientation hypotheses of a page against each other.
#[derive(Clone)]
pub struct RotationRace {
    config: Arc<ScanConfig>,
    factory: Arc<dyn RecognizerFactory>,
}

impl RotationRace {
    pub fn new(config: Arc<ScanConfig>, factory: Arc<dyn RecognizerFactory>) -> Self {
        Self { config, factory }
    }

    /// Scan `image` under every rotation and return the first conclusive
    /// (`SUCCESS` or `PARTIAL`) attempt to finish.
    ///
    /// Which rotation wins when several would succeed depends on scheduling.
    /// `Ok(None)` means every attempt ended `FAILED`.
    ///
    /// # Errors
    ///
    /// [`FitcheckError::EngineInitialization`] if an engine could not be
    /// created and no attempt produced a conclusive result.
    #[instrument(skip_all, fields(session = %session))]
    pub async fn try_rotations(
        &self,
        image: &DynamicImage,
        session: SessionId,
    ) -> Result<Option<RotationOutcome>> {
        let cancel = CancelFlag::default();
        let source = Arc::new(image.clone());
        let mut attempts: JoinSet<AttemptResult> = JoinSet::new();

        for rotation in Rotation::RACE_ORDER {
            let config = Arc::clone(&self.config);
            let factory = Arc::clone(&self.factory);
            let cancel = cancel.clone();
            let source = Arc::clone(&source);
            let span = info_span!("rotation_attempt", %session, %rotation);

            attempts.spawn_blocking(move || {
                let _entered = span.enter();
                let result = run_attempt(&config, factory.as_ref(), &cancel, &source, rotation);
                (rotation, result)
            });
        }

        let mut accepted = None;
        let mut init_error = None;

        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok((rotation, Ok(state))) if state.verdict().is_conclusive() => {
                    info!(%rotation, verdict = %state.verdict(), "Rotation accepted");
                    accepted = Some(RotationOutcome { rotation, state });
                    break;
                }
                Ok((rotation, Ok(state))) => {
                    debug!(%rotation, verdict = %state.verdict(), "Rotation inconclusive");
                }
                Ok((rotation, Err(FitcheckError::Cancelled))) => {
                    debug!(%rotation, "Rotation cancelled");
                }
                Ok((rotation, Err(err))) if err.is_configuration() => {
                    warn!(%rotation, error = %err, "OCR engine unavailable for rotation");
                    init_error.get_or_insert(err);
                }
                Ok((rotation, Err(err))) => {
                    warn!(%rotation, error = %err, "Rotation attempt errored");
                }
                Err(err) => {
                    warn!(error = %err, "Rotation task did not complete");
                }
            }
        }

        cancel.cancel();
        self.wind_down(&mut attempts).await;

        match (accepted, init_error) {
            (Some(outcome), _) => Ok(Some(outcome)),
            (None, Some(err)) => Err(err),
            (None, None) => {
                info!("No rotation produced a conclusive result");
                Ok(None)
            }
        }
    }

    /// Give cancelled attempts a bounded window to return, then detach the
    /// stragglers so a stuck engine cannot hold up the caller.
    async fn wind_down(&self, attempts: &mut JoinSet<AttemptResult>) {
        if attempts.is_empty() {
            return;
        }

        let grace = Duration::from_millis(self.config.shutdown_grace_ms);
        let drained = tokio::time::timeout(grace, async {
            while attempts.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = attempts.len(),
                grace_ms = self.config.shutdown_grace_ms,
                "Rotation attempts still running after cancellation, detaching"
            );
            attempts.detach_all();
        }
    }
}

/// One rotation hypothesis, start to finish, on the calling thread.
///
/// Engine creation failures come back as `EngineInitialization`. Cancellation
/// comes back as `Cancelled`. Any other scan error is logged and recorded as
/// a `FAILED` verdict so it cannot affect sibling attempts.
fn run_attempt(
    config: &ScanConfig,
    factory: &dyn RecognizerFactory,
    cancel: &CancelFlag,
    source: &DynamicImage,
    rotation: Rotation,
) -> Result<ClassifierState> {
    cancel.check()?;
    let mut recognizer = factory.create().map_err(|err| match err {
        FitcheckError::EngineInitialization(_) => err,
        other => FitcheckError::EngineInitialization(other.to_string()),
    })?;

    let oriented = orient(source, rotation);
    let mut state = ClassifierState::new(config);
    let scanned =
        RegionScanner::new(config, recognizer.as_mut(), cancel).scan(&oriented, &mut state);

    match scanned {
        Ok(Verdict::Success) => state.set_image(oriented),
        Ok(_) => {}
        Err(FitcheckError::Cancelled) => return Err(FitcheckError::Cancelled),
        Err(err) => {
            warn!(error = %err, "Scan failed, marking rotation FAILED");
            state.mark_failed();
        }
    }

    debug!(verdict = %state.verdict(), "Rotation attempt finished");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Instant;

    use fitcheck_core::Region;

    use super::*;
    use crate::scan::ocr::TextRecognizer;
    use crate::test_support::{
        ColourCodedFactory, FailingFactory, blank_page, quadrant_page, test_config,
        top_left_only_page,
    };

    struct BrokenRecognizer;

    impl TextRecognizer for BrokenRecognizer {
        fn recognize_text(&mut self, _image: &DynamicImage) -> Result<String> {
            Err(FitcheckError::Ocr("engine crashed".into()))
        }
    }

    struct BrokenFactory;

    impl RecognizerFactory for BrokenFactory {
        fn create(&self) -> Result<Box<dyn TextRecognizer>> {
            Ok(Box::new(BrokenRecognizer))
        }
    }

    fn race(factory: Arc<dyn RecognizerFactory>) -> RotationRace {
        RotationRace::new(Arc::new(test_config()), factory)
    }

    #[tokio::test]
    async fn upright_page_succeeds() {
        let outcome = race(Arc::new(ColourCodedFactory::default()))
            .try_rotations(&quadrant_page(), SessionId::new())
            .await
            .unwrap()
            .expect("upright page should be recognised");

        assert_eq!(outcome.verdict(), Verdict::Success);
        assert_eq!(outcome.rotation, Rotation::Deg0);
        assert!(outcome.state.image().is_some());
    }

    #[tokio::test]
    async fn upside_down_page_is_corrected() {
        let page = quadrant_page().rotate180();
        let outcome = race(Arc::new(ColourCodedFactory::default()))
            .try_rotations(&page, SessionId::new())
            .await
            .unwrap()
            .expect("upside-down page should be recognised");

        assert_eq!(outcome.rotation, Rotation::Deg180);
        let corrected = outcome.state.image().unwrap();
        assert_eq!(corrected.to_rgba8(), quadrant_page().to_rgba8());
    }

    #[tokio::test]
    async fn single_corner_is_accepted_as_partial_without_image() {
        let outcome = race(Arc::new(ColourCodedFactory::default()))
            .try_rotations(&top_left_only_page(), SessionId::new())
            .await
            .unwrap()
            .expect("partial match is conclusive");

        assert_eq!(outcome.verdict(), Verdict::Partial);
        assert_eq!(outcome.state.percentage(Region::TopLeft), 100);
        assert!(outcome.state.image().is_none());
    }

    #[tokio::test]
    async fn unreadable_page_yields_none() {
        let result = race(Arc::new(ColourCodedFactory::default()))
            .try_rotations(&blank_page(255), SessionId::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn ocr_errors_become_failed_attempts() {
        let result = race(Arc::new(BrokenFactory))
            .try_rotations(&quadrant_page(), SessionId::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn engine_failure_everywhere_is_an_error() {
        let err = race(Arc::new(FailingFactory::always()))
            .try_rotations(&quadrant_page(), SessionId::new())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn engine_failure_surfaces_when_nothing_else_matched() {
        let err = race(Arc::new(FailingFactory::first(1)))
            .try_rotations(&blank_page(0), SessionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FitcheckError::EngineInitialization(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn siblings_stop_calling_ocr_after_a_success() {
        // Losing rotations need four OCR calls each; their third is slow, so
        // the upright attempt wins while they are still inside it.
        let factory = Arc::new(ColourCodedFactory::slow_after(2, Duration::from_millis(300)));
        let calls = factory.call_counter();

        let outcome = race(factory.clone())
            .try_rotations(&quadrant_page(), SessionId::new())
            .await
            .unwrap();
        assert_eq!(outcome.unwrap().rotation, Rotation::Deg0);

        let settled = calls.load(Ordering::SeqCst);
        let uncancelled = 2 + 3 * 4;
        assert!(settled < uncancelled, "{settled} OCR calls, siblings were not cancelled");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), settled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stuck_siblings_do_not_outlive_the_grace_period() {
        let config = ScanConfig {
            shutdown_grace_ms: 100,
            ..test_config()
        };
        let factory = Arc::new(ColourCodedFactory::slow_after(2, Duration::from_millis(1500)));
        let race = RotationRace::new(Arc::new(config), factory);

        let started = Instant::now();
        let outcome = race
            .try_rotations(&quadrant_page(), SessionId::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(outcome.is_some());
        assert!(elapsed < Duration::from_millis(1000), "waited {elapsed:?}");
    }
}
