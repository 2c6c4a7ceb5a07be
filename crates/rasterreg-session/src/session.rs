use rasterreg_geometry::{
    estimate_homography, ControlPointSet, Homography, Point2D, PointSide,
};
use rasterreg_image::{DynImage, Image, ImageDtype, ImageSize};
use rasterreg_imgproc::canvas::normalize_canvas;
use rasterreg_imgproc::interpolation::InterpolationMode;
use rasterreg_imgproc::warp::warp_perspective;

use crate::error::SessionError;
use crate::ledger::{LedgerEntry, LedgerWarning};

/// An image together with the file name it was loaded from.
#[derive(Clone, Debug)]
struct NamedImage {
    image: DynImage,
    name: String,
}

/// The state of one interactive registration: a reference image, a moving
/// image, the live control point set and the cached registration result.
///
/// The reference image defines the output canvas and is never resampled.
/// Mutating the control points or either image invalidates the cached
/// transform and registered image; estimation only happens on [`apply`].
///
/// Sessions are plain owned values: tests and callers may hold several
/// independent sessions at once. Callers that share one session between a
/// batch run and interactive edits must serialize access themselves; batch
/// jobs therefore work on a [`crate::BatchContext`] snapshot instead of the
/// live session.
///
/// [`apply`]: RegistrationSession::apply
#[derive(Clone, Debug, Default)]
pub struct RegistrationSession {
    reference: Option<NamedImage>,
    moving: Option<NamedImage>,
    points: ControlPointSet,
    transform: Option<Homography>,
    registered: Option<DynImage>,
}

impl RegistrationSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a reference image, replacing the previous one.
    ///
    /// Clears the moving image, the control points and any cached result.
    pub fn set_reference(&mut self, image: DynImage, name: impl Into<String>) {
        self.reference = Some(NamedImage {
            image,
            name: name.into(),
        });
        self.moving = None;
        self.points.clear();
        self.invalidate();
    }

    /// Load a moving image.
    ///
    /// Resets the control points to the default layout for the current
    /// reference and moving image bounds.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NoReference`] if no reference is loaded.
    pub fn set_moving(
        &mut self,
        image: DynImage,
        name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let reference = self.reference.as_ref().ok_or(SessionError::NoReference)?;

        self.points = ControlPointSet::default_for(reference.image.size(), image.size());
        self.moving = Some(NamedImage {
            image,
            name: name.into(),
        });
        self.invalidate();

        Ok(())
    }

    /// The loaded reference image, if any.
    pub fn reference(&self) -> Option<&DynImage> {
        self.reference.as_ref().map(|named| &named.image)
    }

    /// The loaded moving image, if any.
    pub fn moving(&self) -> Option<&DynImage> {
        self.moving.as_ref().map(|named| &named.image)
    }

    /// The output canvas size, equal to the reference image size.
    pub fn canvas_size(&self) -> Option<ImageSize> {
        self.reference().map(|image| image.size())
    }

    /// The current control point set.
    pub fn points(&self) -> &ControlPointSet {
        &self.points
    }

    /// Move one point of one pair, invalidating the cached result.
    ///
    /// Estimation is not rerun eagerly; call [`apply`] to re-register.
    ///
    /// [`apply`]: RegistrationSession::apply
    pub fn update_point(
        &mut self,
        index: usize,
        side: PointSide,
        point: Point2D,
    ) -> Result<(), SessionError> {
        self.points.update(index, side, point)?;
        self.invalidate();
        Ok(())
    }

    /// The cached transform from the last successful [`apply`].
    ///
    /// [`apply`]: RegistrationSession::apply
    pub fn transform(&self) -> Option<&Homography> {
        self.transform.as_ref()
    }

    /// The cached registered image from the last successful [`apply`].
    ///
    /// [`apply`]: RegistrationSession::apply
    pub fn registered(&self) -> Option<&DynImage> {
        self.registered.as_ref()
    }

    /// Estimate the transform from the current control points and resample
    /// the moving image onto the reference canvas.
    ///
    /// The transform and the registered image are cached; calling `apply`
    /// again without mutating the session returns the same result.
    ///
    /// # Errors
    ///
    /// Fails when no reference or moving image is loaded, or when estimation
    /// or resampling fails. A failure never leaves a stale cached result.
    pub fn apply(&mut self) -> Result<&DynImage, SessionError> {
        let reference = self.reference.as_ref().ok_or(SessionError::NoReference)?;
        let moving = self.moving.as_ref().ok_or(SessionError::NoMovingImage)?;

        if self.registered.is_none() {
            let transform = estimate_homography(&self.points)?;
            let registered = register_dyn(&moving.image, reference.image.size(), &transform)?;
            self.transform = Some(transform);
            self.registered = Some(registered);
        }

        match &self.registered {
            Some(registered) => Ok(registered),
            None => Err(SessionError::NoTransform),
        }
    }

    /// Serialize the current session state to a ledger entry.
    ///
    /// # Errors
    ///
    /// Fails when no reference or moving image is loaded.
    pub fn export_ledger_entry(&self) -> Result<LedgerEntry, SessionError> {
        let reference = self.reference.as_ref().ok_or(SessionError::NoReference)?;
        let moving = self.moving.as_ref().ok_or(SessionError::NoMovingImage)?;

        Ok(LedgerEntry {
            destination: None,
            reference_name: reference.name.clone(),
            moving_names: vec![moving.name.clone()],
            canvas: reference.image.size(),
            points: self.points.clone(),
        })
    }

    /// Replace the control points from a ledger entry.
    ///
    /// Metadata that does not match the currently loaded images is reported
    /// as warnings and logged, never as a failure; the caller decides what to
    /// do with them. The cached result is invalidated.
    ///
    /// # Errors
    ///
    /// Fails when the entry carries fewer than the minimum number of pairs.
    pub fn import_ledger_entry(
        &mut self,
        entry: &LedgerEntry,
    ) -> Result<Vec<LedgerWarning>, SessionError> {
        if entry.points.len() < rasterreg_geometry::MIN_PAIRS {
            return Err(SessionError::Geometry(
                rasterreg_geometry::GeometryError::NotEnoughPoints {
                    got: entry.points.len(),
                    min: rasterreg_geometry::MIN_PAIRS,
                },
            ));
        }

        let mut warnings = Vec::new();

        if let Some(reference) = &self.reference {
            if reference.name != entry.reference_name {
                warnings.push(LedgerWarning::ReferenceNameMismatch {
                    entry: entry.reference_name.clone(),
                    loaded: reference.name.clone(),
                });
            }
            if reference.image.size() != entry.canvas {
                warnings.push(LedgerWarning::CanvasMismatch {
                    entry: entry.canvas,
                    loaded: reference.image.size(),
                });
            }
        }

        if let Some(moving) = &self.moving {
            if !entry.moving_names.iter().any(|name| name == &moving.name) {
                warnings.push(LedgerWarning::MovingNameMismatch {
                    entry: entry.moving_names.clone(),
                    loaded: moving.name.clone(),
                });
            }
        }

        for warning in &warnings {
            log::warn!("importing control points: {warning}");
        }

        self.points = entry.points.clone();
        self.invalidate();

        Ok(warnings)
    }

    /// Snapshot the state a batch job needs from this session.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NoTransform`] unless [`apply`] has cached a
    /// transform for the current point set.
    ///
    /// [`apply`]: RegistrationSession::apply
    pub fn batch_context(&self) -> Result<crate::BatchContext, SessionError> {
        let reference = self.reference.as_ref().ok_or(SessionError::NoReference)?;
        let moving = self.moving.as_ref().ok_or(SessionError::NoMovingImage)?;
        let transform = self.transform.ok_or(SessionError::NoTransform)?;

        Ok(crate::BatchContext {
            transform,
            canvas: reference.image.size(),
            moving_size: moving.image.size(),
            reference_name: reference.name.clone(),
            points: self.points.clone(),
        })
    }

    fn invalidate(&mut self) {
        self.transform = None;
        self.registered = None;
    }
}

/// Resample a moving image onto a canvas with a given transform.
///
/// Runs the two mandatory steps in order: canvas normalization (pad or crop
/// to the canvas size, anchored top-left, no rescaling), then the inverse
/// mapped perspective warp with bilinear sampling. Unmapped pixels become
/// transparent when the image carries an alpha channel and black otherwise.
pub(crate) fn register_dyn(
    moving: &DynImage,
    canvas: ImageSize,
    transform: &Homography,
) -> Result<DynImage, SessionError> {
    match moving {
        DynImage::Gray8(image) => {
            register_plane(image, canvas, transform, [0]).map(DynImage::Gray8)
        }
        DynImage::Rgb8(image) => {
            register_plane(image, canvas, transform, [0, 0, 0]).map(DynImage::Rgb8)
        }
        DynImage::Rgba8(image) => {
            register_plane(image, canvas, transform, [0, 0, 0, 0]).map(DynImage::Rgba8)
        }
    }
}

fn register_plane<T, const C: usize>(
    moving: &Image<T, C>,
    canvas: ImageSize,
    transform: &Homography,
    background: [T; C],
) -> Result<Image<T, C>, SessionError>
where
    T: ImageDtype,
{
    let mut padded = Image::from_size_val(canvas, T::default())?;
    normalize_canvas(moving, &mut padded, background);

    let mut warped = Image::from_size_val(canvas, T::default())?;
    warp_perspective(
        &padded,
        &mut warped,
        transform,
        InterpolationMode::Bilinear,
        background,
    )?;

    Ok(warped)
}
