use std::path::Path;

/// Default file name for a registered image.
///
/// Produces `<stem>_registered_to_<reference-stem>.<ext>`, keeping the
/// moving image's extension. Callers may override the result.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use rasterreg_io::naming::registered_file_name;
///
/// let name = registered_file_name(Path::new("wing.png"), Path::new("specimen.tiff"));
/// assert_eq!(name, "wing_registered_to_specimen.png");
/// ```
pub fn registered_file_name(moving: &Path, reference: &Path) -> String {
    let stem = file_stem(moving);
    let reference_stem = file_stem(reference);
    let extension = extension_or_png(moving);

    format!("{stem}_registered_to_{reference_stem}.{extension}")
}

/// Default file name for an alphascale image.
///
/// Produces `<stem>_alphascale_rgb_<R>_<G>_<B>.<ext>`. JPEG sources switch to
/// a PNG extension since the output carries an alpha channel.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use rasterreg_io::naming::alphascale_file_name;
///
/// let name = alphascale_file_name(Path::new("scan.jpg"), [255, 0, 0]);
/// assert_eq!(name, "scan_alphascale_rgb_255_0_0.png");
/// ```
pub fn alphascale_file_name(input: &Path, tint: [u8; 3]) -> String {
    let stem = file_stem(input);
    let extension = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => "png",
        Some(ext) => ext,
        None => "png",
    };

    format!(
        "{stem}_alphascale_rgb_{}_{}_{}.{extension}",
        tint[0], tint[1], tint[2]
    )
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("image")
}

fn extension_or_png(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("png")
}
