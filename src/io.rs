//! Plain-text output for external plotting.

use crate::{basis::Basis, Complex64};

use std::{fs::File, io::BufWriter, path::Path};

/// A solution value and its derivative at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
  pub x: f64,
  pub value: Complex64,
  pub derivative: Complex64,
}

pub fn sample<B: Basis + ?Sized>(u: &B, grid: &[f64]) -> Vec<Sample> {
  grid
    .iter()
    .map(|&x| Sample {
      x,
      value: u.evaluate(x),
      derivative: u.derivative(x),
    })
    .collect()
}

/// One line per sample: `x re(u) im(u) re(u') im(u')`.
pub fn write_samples<W: std::io::Write>(mut writer: W, samples: &[Sample]) -> std::io::Result<()> {
  for s in samples {
    writeln!(
      writer,
      "{:.6} {:.6} {:.6} {:.6} {:.6}",
      s.x, s.value.re, s.value.im, s.derivative.re, s.derivative.im
    )?;
  }
  Ok(())
}

pub fn save_samples_to_file(samples: &[Sample], path: impl AsRef<Path>) -> std::io::Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_samples(writer, samples)
}

/// One line per iteration: `iteration loss`.
pub fn write_loss_trace<W: std::io::Write>(mut writer: W, losses: &[f64]) -> std::io::Result<()> {
  for (iteration, loss) in losses.iter().enumerate() {
    writeln!(writer, "{iteration} {loss:e}")?;
  }
  Ok(())
}

pub fn save_loss_trace_to_file(losses: &[f64], path: impl AsRef<Path>) -> std::io::Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_loss_trace(writer, losses)
}
