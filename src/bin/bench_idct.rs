use jpegdec_rs::constants::BLOCK_DIM;
use jpegdec_rs::jpeg1::dct::{idct_8x8, idct_8x8_baseline};
use std::time::Instant;

fn main() {
    println!("Benchmarking IDCT implementations...");

    // A typical low-frequency block: DC plus a few AC terms.
    let mut coefficients = [0i32; BLOCK_DIM];
    coefficients[..4].copy_from_slice(&[80, 40, -16, 8]);
    coefficients[8] = 24;
    coefficients[9] = 8;
    coefficients[16] = -8;
    let input: [f32; BLOCK_DIM] = coefficients.map(|c| c as f32);

    let iterations = 1_000_000;

    let mut output_baseline = [0.0f32; BLOCK_DIM];
    let start = Instant::now();
    for _ in 0..iterations {
        idct_8x8_baseline(std::hint::black_box(&input), &mut output_baseline);
        std::hint::black_box(output_baseline);
    }
    let duration_baseline = start.elapsed();
    println!("Baseline (Float) IDCT: {:?} for {} iterations", duration_baseline, iterations);

    let mut output_integer = coefficients;
    let start = Instant::now();
    for _ in 0..iterations {
        output_integer = std::hint::black_box(coefficients);
        idct_8x8(&mut output_integer);
        std::hint::black_box(&output_integer);
    }
    let duration_integer = start.elapsed();
    println!("Integer IDCT: {:?} for {} iterations", duration_integer, iterations);

    let speedup = duration_baseline.as_secs_f64() / duration_integer.as_secs_f64();
    println!("Speedup: {:.2}x", speedup);

    let max_diff = output_baseline
        .iter()
        .zip(output_integer)
        .map(|(&reference, value)| (reference - value as f32).abs())
        .fold(0.0f32, f32::max);
    println!("Max difference between float and integer IDCT: {}", max_diff);

    if max_diff <= 1.0 {
        println!("Accuracy: PASSED (Tolerance <= 1.0)");
    } else {
        println!("Accuracy: FAILED (Tolerance > 1.0)");
    }
}
