use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use rasterreg_geometry::{ControlPointSet, Homography};
use rasterreg_image::ImageSize;
use rasterreg_io::functional::{read_image_any, write_image_any};
use rasterreg_io::naming::registered_file_name;

use crate::error::SessionError;
use crate::ledger::LedgerEntry;
use crate::session::register_dyn;

/// Callback reporting per-item completion of a batch run.
///
/// Receives the finished outcome, the number of completed items and the
/// total item count.
pub type ProgressCallback = Arc<Mutex<dyn FnMut(&BatchOutcome, usize, usize) + Send>>;

/// Cooperative cancellation flag for a batch run.
///
/// Cancellation is honored between items; an in-flight single-image resample
/// is never interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the batch run holding this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The state a batch run borrows from a registration session.
///
/// A context is an owned snapshot, so a running batch never contends with
/// interactive edits of the live session.
#[derive(Clone, Debug)]
pub struct BatchContext {
    pub(crate) transform: Homography,
    pub(crate) canvas: ImageSize,
    pub(crate) moving_size: ImageSize,
    pub(crate) reference_name: String,
    pub(crate) points: ControlPointSet,
}

/// One batch registration request: where to write, and which sources to
/// register.
#[derive(Clone, Debug)]
pub struct BatchJob {
    /// Folder the registered images are written to.
    pub destination: PathBuf,
    /// The source image files to register.
    pub sources: Vec<PathBuf>,
}

/// The result of registering one batch item.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The item was registered and written.
    Registered {
        /// The source image file.
        source: PathBuf,
        /// The written output file.
        output: PathBuf,
    },
    /// The item failed; the rest of the batch continues.
    Failed {
        /// The source image file.
        source: PathBuf,
        /// Why the item failed.
        reason: SessionError,
    },
}

/// The result of a whole batch run.
#[derive(Debug)]
pub struct BatchReport {
    /// Per-item outcomes in source order.
    pub outcomes: Vec<BatchOutcome>,
    /// Whether the run stopped early due to cancellation.
    pub cancelled: bool,
    /// Ledger entry describing the batch: destination folder, reference name
    /// and the successfully registered file names, with the shared point set.
    pub ledger: LedgerEntry,
}

impl BatchReport {
    /// The successfully written output paths.
    pub fn registered_outputs(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                BatchOutcome::Registered { output, .. } => Some(output.as_path()),
                BatchOutcome::Failed { .. } => None,
            })
            .collect()
    }
}

/// Compute the destination path for one batch source.
fn output_path(context: &BatchContext, job: &BatchJob, source: &Path) -> PathBuf {
    job.destination
        .join(registered_file_name(source, Path::new(&context.reference_name)))
}

/// Pre-flight pass over a whole job: the destination files that already
/// exist.
///
/// Runs before any write so the caller can confirm or cancel overwriting.
pub fn collisions(context: &BatchContext, job: &BatchJob) -> Vec<PathBuf> {
    job.sources
        .iter()
        .map(|source| output_path(context, job, source))
        .filter(|path| path.exists())
        .collect()
}

/// Register every source of a job with the session transform and write the
/// results to the destination folder.
///
/// The run starts with the collision pre-flight over the whole batch; when
/// collisions exist and `allow_overwrite` is false, it returns
/// [`SessionError::DestinationExists`] before any write. Items whose
/// dimensions do not match the session's moving image fail individually
/// without aborting the rest, and nothing is written for them.
///
/// # Errors
///
/// Only the pre-flight collision check fails the run as a whole; per-item
/// failures are reported in the [`BatchReport`].
pub fn run(
    context: &BatchContext,
    job: &BatchJob,
    allow_overwrite: bool,
    progress: Option<ProgressCallback>,
    cancel: Option<&CancelToken>,
) -> Result<BatchReport, SessionError> {
    let existing = collisions(context, job);
    if !existing.is_empty() && !allow_overwrite {
        return Err(SessionError::DestinationExists(existing));
    }

    let total = job.sources.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut registered_names = Vec::new();
    let mut cancelled = false;

    for (index, source) in job.sources.iter().enumerate() {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            log::info!("batch cancelled after {} of {} items", index, total);
            cancelled = true;
            break;
        }

        let outcome = match register_one(context, job, source) {
            Ok(output) => {
                log::info!(
                    "registered {} -> {} ({}/{})",
                    source.display(),
                    output.display(),
                    index + 1,
                    total
                );
                if let Some(name) = source.file_name().and_then(|n| n.to_str()) {
                    registered_names.push(name.to_string());
                }
                BatchOutcome::Registered {
                    source: source.clone(),
                    output,
                }
            }
            Err(reason) => {
                log::warn!("failed to register {}: {reason}", source.display());
                BatchOutcome::Failed {
                    source: source.clone(),
                    reason,
                }
            }
        };

        if let Some(callback) = &progress {
            if let Ok(mut callback) = callback.lock() {
                (*callback)(&outcome, index + 1, total);
            }
        }

        outcomes.push(outcome);
    }

    let ledger = LedgerEntry {
        destination: Some(job.destination.clone()),
        reference_name: context.reference_name.clone(),
        moving_names: registered_names,
        canvas: context.canvas,
        points: context.points.clone(),
    };

    Ok(BatchReport {
        outcomes,
        cancelled,
        ledger,
    })
}

/// Run a batch job on its own thread.
///
/// The caller stays responsive while the batch executes; progress arrives
/// through the callback and the token cancels cooperatively between items.
pub fn spawn(
    context: BatchContext,
    job: BatchJob,
    allow_overwrite: bool,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> JoinHandle<Result<BatchReport, SessionError>> {
    std::thread::spawn(move || run(&context, &job, allow_overwrite, progress, Some(&cancel)))
}

fn register_one(
    context: &BatchContext,
    job: &BatchJob,
    source: &Path,
) -> Result<PathBuf, SessionError> {
    let image = read_image_any(source)?;

    if image.size() != context.moving_size {
        return Err(SessionError::DimensionMismatch {
            path: source.to_path_buf(),
            got: image.size(),
            expected: context.moving_size,
        });
    }

    let registered = register_dyn(&image, context.canvas, &context.transform)?;

    let output = output_path(context, job, source);
    write_image_any(&output, &registered)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterreg_image::{DynImage, Gray8};
    use rasterreg_io::png::write_image_png_gray8;

    use crate::session::RegistrationSession;

    fn gray(size: usize, val: u8) -> Gray8 {
        Gray8::from_size_val(
            ImageSize {
                width: size,
                height: size,
            },
            val,
        )
        .unwrap()
    }

    fn aligned_context(side: usize) -> BatchContext {
        let image = DynImage::Gray8(gray(side, 50));

        let mut session = RegistrationSession::new();
        session.set_reference(image.clone(), "reference.png");
        session.set_moving(image, "moving.png").unwrap();
        session.apply().unwrap();
        session.batch_context().unwrap()
    }

    #[test]
    fn batch_continues_past_mismatched_item() -> Result<(), SessionError> {
        let tmp_dir = tempfile::tempdir().map_err(rasterreg_io::IoError::FileError)?;
        let src_dir = tmp_dir.path().join("src");
        let dst_dir = tmp_dir.path().join("dst");
        std::fs::create_dir_all(&src_dir).map_err(rasterreg_io::IoError::FileError)?;
        std::fs::create_dir_all(&dst_dir).map_err(rasterreg_io::IoError::FileError)?;

        let good_a = src_dir.join("a.png");
        let good_b = src_dir.join("b.png");
        let bad = src_dir.join("bad.png");
        write_image_png_gray8(&good_a, &gray(8, 10))?;
        write_image_png_gray8(&good_b, &gray(8, 20))?;
        write_image_png_gray8(&bad, &gray(6, 30))?;

        let context = aligned_context(8);
        let job = BatchJob {
            destination: dst_dir.clone(),
            sources: vec![good_a, bad.clone(), good_b],
        };

        let report = run(&context, &job, false, None, None)?;
        assert!(!report.cancelled);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.registered_outputs().len(), 2);

        match &report.outcomes[1] {
            BatchOutcome::Failed { source, reason } => {
                assert_eq!(source, &bad);
                assert!(matches!(
                    reason,
                    SessionError::DimensionMismatch { .. }
                ));
            }
            other => panic!("expected failure for mismatched item, got {other:?}"),
        }

        // nothing was written for the failed item
        assert!(!dst_dir
            .join(registered_file_name(&bad, Path::new("reference.png")))
            .exists());

        // the aggregate ledger lists the destination and only the registered
        // sources
        assert_eq!(report.ledger.destination.as_deref(), Some(dst_dir.as_path()));
        assert_eq!(
            report.ledger.moving_names,
            vec!["a.png".to_string(), "b.png".to_string()]
        );
        assert_eq!(report.ledger.reference_name, "reference.png");

        Ok(())
    }

    #[test]
    fn preflight_reports_collisions_before_writing() -> Result<(), SessionError> {
        let tmp_dir = tempfile::tempdir().map_err(rasterreg_io::IoError::FileError)?;
        let dst_dir = tmp_dir.path().to_path_buf();

        let source = tmp_dir.path().join("a.png");
        write_image_png_gray8(&source, &gray(8, 10))?;

        let context = aligned_context(8);
        let job = BatchJob {
            destination: dst_dir,
            sources: vec![source],
        };

        let first = run(&context, &job, false, None, None)?;
        assert_eq!(first.registered_outputs().len(), 1);

        // second run hits the existing output in the pre-flight pass
        let second = run(&context, &job, false, None, None);
        match second {
            Err(SessionError::DestinationExists(paths)) => assert_eq!(paths.len(), 1),
            other => panic!("expected collision error, got {other:?}"),
        }

        // explicit overwrite proceeds
        let third = run(&context, &job, true, None, None)?;
        assert_eq!(third.registered_outputs().len(), 1);

        Ok(())
    }

    #[test]
    fn cancellation_stops_between_items() -> Result<(), SessionError> {
        let tmp_dir = tempfile::tempdir().map_err(rasterreg_io::IoError::FileError)?;

        let source = tmp_dir.path().join("a.png");
        write_image_png_gray8(&source, &gray(8, 10))?;

        let context = aligned_context(8);
        let job = BatchJob {
            destination: tmp_dir.path().to_path_buf(),
            sources: vec![source],
        };

        let token = CancelToken::new();
        token.cancel();

        let report = run(&context, &job, false, None, Some(&token))?;
        assert!(report.cancelled);
        assert!(report.outcomes.is_empty());

        Ok(())
    }

    #[test]
    fn spawned_batch_reports_progress() -> Result<(), SessionError> {
        let tmp_dir = tempfile::tempdir().map_err(rasterreg_io::IoError::FileError)?;
        let src_dir = tmp_dir.path().join("src");
        let dst_dir = tmp_dir.path().join("dst");
        std::fs::create_dir_all(&src_dir).map_err(rasterreg_io::IoError::FileError)?;
        std::fs::create_dir_all(&dst_dir).map_err(rasterreg_io::IoError::FileError)?;

        let mut sources = Vec::new();
        for i in 0..3 {
            let path = src_dir.join(format!("img_{i}.png"));
            write_image_png_gray8(&path, &gray(8, i as u8))?;
            sources.push(path);
        }

        let context = aligned_context(8);
        let job = BatchJob {
            destination: dst_dir,
            sources,
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(Mutex::new(move |_: &BatchOutcome, done, total| {
            if let Ok(mut seen) = seen_in_callback.lock() {
                seen.push((done, total));
            }
        }));

        let handle = spawn(context, job, false, Some(progress), CancelToken::new());
        let report = handle.join().expect("batch thread panicked")?;

        assert_eq!(report.registered_outputs().len(), 3);
        let seen = seen.lock().expect("progress mutex poisoned");
        assert_eq!(seen.as_slice(), &[(1, 3), (2, 3), (3, 3)]);

        Ok(())
    }
}
