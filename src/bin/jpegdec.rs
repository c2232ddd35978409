//! jpegdec CLI - decodes baseline and progressive JPEG files.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use jpegdec_rs::{ColorModel, FromRgba, ImageBuffer, Jpeg1Decoder};

/// Baseline and progressive JPEG decoder
#[derive(Parser)]
#[command(name = "jpegdec")]
#[command(version)]
#[command(about = "Decode JPEG images to raw pixels or PPM/PGM", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegdec decode -i image.jpg -o pixels.raw
    jpegdec decode -i image.jpg -o image.ppm -f ppm
    jpegdec info -i image.jpg

Set RUST_LOG=debug to trace the segments of the stream.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a JPEG image to raw pixels or a Portable AnyMap
    ///
    /// Grayscale images produce one byte per pixel, everything else RGB.
    #[command(visible_alias = "d")]
    Decode {
        /// Input JPEG file
        #[arg(short, long, help = "Path to the input image file")]
        input: PathBuf,

        /// Output file path for decoded pixels
        #[arg(short, long, help = "Path for the output file")]
        output: PathBuf,

        /// Output format: raw (binary pixels) or ppm (PPM/PGM)
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },

    /// Display the frame parameters and metadata of a JPEG image
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the image file to inspect")]
        input: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw binary pixel data
    Raw,
    /// Portable PixMap (PPM/PGM) format
    Ppm,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            format,
        } => decode_image(&input, &output, &format),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn decode_image(input: &Path, output: &Path, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let mut decoder = Jpeg1Decoder::new(&data[..]);
    let info = decoder.read_info()?;

    let (pixels, width, height, components) = if info.color_model == Some(ColorModel::Grayscale) {
        let image = decode_into::<u8>(&mut decoder)?;
        let (width, height) = (image.width(), image.height());
        (image.into_pixels(), width, height, 1)
    } else {
        let image = decode_into::<[u8; 3]>(&mut decoder)?;
        let (width, height) = (image.width(), image.height());
        (image.into_pixels().concat(), width, height, 3)
    };

    match format {
        OutputFormat::Raw => fs::write(output, &pixels)?,
        OutputFormat::Ppm => write_ppm(output, &pixels, width, height, components)?,
    }

    println!(
        "✓ Decoded {}x{} image ({} components) to {:?}",
        width, height, components, output
    );
    Ok(())
}

fn decode_into<P>(decoder: &mut Jpeg1Decoder<&[u8]>) -> jpegdec_rs::Result<ImageBuffer<P>>
where
    P: FromRgba + Default + Send,
{
    let mut image = ImageBuffer::new();
    decoder.decode(&mut image, false)?;
    Ok(image)
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    let mut decoder = Jpeg1Decoder::new(&data[..]);
    let info = decoder.read_info()?;
    let mut metadata = ImageBuffer::<u8>::new();
    decoder.decode(&mut metadata, true)?;

    println!("Format: JPEG");
    println!("  Dimensions: {}x{}", info.width, info.height);
    println!("  Bit depth:  {} bits", info.bits_per_sample);
    println!("  Components: {}", info.component_count);
    println!(
        "  Mode:       {}",
        if info.is_progressive { "Progressive" } else { "Sequential" }
    );
    match info.color_model {
        Some(model) => println!("  Color:      {:?}", model),
        None => println!("  Color:      unknown (no Adobe segment)"),
    }
    if info.restart_interval > 0 {
        println!("  Restart:    every {} MCUs", info.restart_interval);
    }
    if let Some((horizontal, vertical)) = metadata.resolution() {
        println!("  Resolution: {:.0}x{:.0} dpi", horizontal, vertical);
    }
    if let Some(exif) = metadata.exif_profile() {
        println!("  Exif:       {} bytes", exif.len());
    }
    Ok(())
}

fn write_ppm(
    path: &Path,
    pixels: &[u8],
    width: usize,
    height: usize,
    components: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = fs::File::create(path)?;

    if components == 1 {
        writeln!(file, "P5")?;
    } else {
        writeln!(file, "P6")?;
    }
    writeln!(file, "{} {}", width, height)?;
    writeln!(file, "255")?;
    file.write_all(pixels)?;

    Ok(())
}
