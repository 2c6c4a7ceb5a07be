use rasterreg::image::{Gray8, ImageSize, Rgba8};
use rasterreg::imgproc::alphascale::{alphascale_from_gray, merge_alphascale};
use rasterreg::io::naming::alphascale_file_name;
use rasterreg::io::png::write_image_png_rgba8;

fn radial_gray(size: ImageSize, cx: f32, cy: f32) -> Gray8 {
    let mut data = Vec::with_capacity(size.width * size.height);
    for y in 0..size.height {
        for x in 0..size.width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            data.push((255.0 - d.min(255.0)) as u8);
        }
    }
    Gray8::new(size, data).expect("valid buffer")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let size = ImageSize {
        width: 128,
        height: 128,
    };

    let tints: [[u8; 3]; 2] = [[0, 80, 255], [255, 40, 0]];
    let sources = [
        radial_gray(size, 40.0, 64.0),
        radial_gray(size, 88.0, 64.0),
    ];

    let out_dir = std::env::temp_dir();
    let mut layers = Vec::new();

    for (gray, tint) in sources.iter().zip(tints) {
        let mut layer = Rgba8::from_size_val(size, 0)?;
        alphascale_from_gray(gray, &mut layer, tint)?;

        let name = alphascale_file_name(std::path::Path::new("spot.png"), tint);
        let path = out_dir.join(name);
        write_image_png_rgba8(&path, &layer)?;
        println!("wrote {}", path.display());

        layers.push(layer);
    }

    let mut merged = Rgba8::from_size_val(size, 0)?;
    merge_alphascale(&layers, &mut merged)?;

    let merged_path = out_dir.join("spots_merged.png");
    write_image_png_rgba8(&merged_path, &merged)?;
    println!("wrote {}", merged_path.display());

    Ok(())
}
