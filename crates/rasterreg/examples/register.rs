use rasterreg::geometry::{Point2D, PointSide};
use rasterreg::image::{DynImage, Gray8, ImageSize};
use rasterreg::io::functional::write_image_any;
use rasterreg::io::naming::registered_file_name;
use rasterreg::session::RegistrationSession;

fn checkerboard(size: ImageSize, cell: usize) -> DynImage {
    let mut data = Vec::with_capacity(size.width * size.height);
    for y in 0..size.height {
        for x in 0..size.width {
            let on = (x / cell + y / cell) % 2 == 0;
            data.push(if on { 220 } else { 30 });
        }
    }
    DynImage::Gray8(Gray8::new(size, data).expect("valid buffer"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let canvas = ImageSize {
        width: 256,
        height: 256,
    };
    let reference = checkerboard(canvas, 32);
    let moving = checkerboard(
        ImageSize {
            width: 200,
            height: 200,
        },
        32,
    );

    let mut session = RegistrationSession::new();
    session.set_reference(reference, "reference.png");
    session.set_moving(moving, "moving.png")?;

    // nudge one pair as an interactive edit would
    session.update_point(0, PointSide::Moving, Point2D::new(62.0, 58.0))?;
    session.update_point(0, PointSide::Reference, Point2D::new(80.0, 76.0))?;

    let registered = session.apply()?.clone();
    log::info!(
        "registered {}x{} moving image onto {} canvas",
        200,
        200,
        registered.size()
    );

    let out_dir = std::env::temp_dir();
    let out_path = out_dir.join(registered_file_name(
        std::path::Path::new("moving.png"),
        std::path::Path::new("reference.png"),
    ));
    write_image_any(&out_path, &registered)?;
    println!("wrote {}", out_path.display());

    let entry = session.export_ledger_entry()?;
    let csv_path = out_dir.join("registration_points.csv");
    entry.save(&csv_path)?;
    println!("wrote {}", csv_path.display());

    Ok(())
}
