use std::fs;
use std::io;
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::consts;
use crate::error::FmError;
use crate::parameters::{ModelShape, Parameters};

/*
Model file, one value per line, decimal text:
    degree
    factor size
    feature count
    bias
    weights, feature_count lines
    factors for degree index 1 .. degree-1, each in j * feature_count + k order
*/

pub fn save_regressor_to_filename(filename: &str, weights: &Parameters) -> Result<(), FmError> {
    let file = fs::File::create(filename).map_err(|e| FmError::io(filename, e))?;
    let mut output_bufwriter = io::BufWriter::new(file);
    write_parameters_to_buf(weights, &mut output_bufwriter)
        .and_then(|_| output_bufwriter.flush())
        .map_err(|e| FmError::io(filename, e))?;
    log::info!("Saved model to {}", filename);
    Ok(())
}

pub fn write_parameters_to_buf(
    weights: &Parameters,
    output_bufwriter: &mut dyn io::Write,
) -> io::Result<()> {
    let shape = weights.shape();
    writeln!(output_bufwriter, "{}", shape.degree)?;
    writeln!(output_bufwriter, "{}", shape.factor_size)?;
    writeln!(output_bufwriter, "{}", shape.feature_count)?;
    // f32 Display is the shortest text that parses back to the same value
    writeln!(output_bufwriter, "{}", weights.w0)?;
    for w in weights.w.iter() {
        writeln!(output_bufwriter, "{}", w)?;
    }
    for d in shape.interaction_degrees() {
        for v in weights.v.slab(d).iter() {
            writeln!(output_bufwriter, "{}", v)?;
        }
    }
    Ok(())
}

pub fn new_parameters_from_filename(filename: &str) -> Result<Parameters, FmError> {
    let file = fs::File::open(filename).map_err(|e| FmError::io(filename, e))?;
    let mut input_bufreader = io::BufReader::new(file);
    let weights = read_parameters_from_buf(&mut input_bufreader, filename)?;
    let shape = weights.shape();
    log::info!(
        "Loaded model from {}: degree {}, factor size {}, {} features",
        filename,
        shape.degree,
        shape.factor_size,
        shape.feature_count
    );
    Ok(weights)
}

struct ModelLineReader<'a> {
    input_bufreader: &'a mut dyn BufRead,
    source_name: &'a str,
    line_buf: String,
    line_number: usize,
}

impl<'a> ModelLineReader<'a> {
    fn next_value<T: FromStr>(&mut self, what: &str) -> Result<T, FmError> {
        self.line_buf.truncate(0);
        let len = self
            .input_bufreader
            .read_line(&mut self.line_buf)
            .map_err(|e| FmError::io(self.source_name, e))?;
        self.line_number += 1;
        if len == 0 {
            return Err(FmError::ModelFormat {
                line: self.line_number,
                reason: format!("unexpected end of file, expected {}", what),
            });
        }
        let token = self.line_buf.trim();
        token.parse::<T>().map_err(|_| FmError::ModelFormat {
            line: self.line_number,
            reason: format!("can't parse {} from \"{}\"", what, token),
        })
    }

    fn next_header_value(&mut self, what: &str, max: usize) -> Result<usize, FmError> {
        let value: usize = self.next_value(what)?;
        if value < 1 || value > max {
            return Err(FmError::ModelFormat {
                line: self.line_number,
                reason: format!("{} should be in [1, {}], got {}", what, max, value),
            });
        }
        Ok(value)
    }

    fn next_weight(&mut self, what: &str) -> Result<f32, FmError> {
        let value: f32 = self.next_value(what)?;
        if !value.is_finite() {
            return Err(FmError::ModelFormat {
                line: self.line_number,
                reason: format!("{} is not finite", what),
            });
        }
        Ok(value)
    }
}

/// Shape comes from the three header lines, everything after the last factor is ignored
pub fn read_parameters_from_buf(
    input_bufreader: &mut dyn BufRead,
    source_name: &str,
) -> Result<Parameters, FmError> {
    let mut reader = ModelLineReader {
        input_bufreader,
        source_name,
        line_buf: String::new(),
        line_number: 0,
    };
    let degree = reader.next_header_value("degree", consts::MAX_FM_DEGREE as usize)?;
    let factor_size = reader.next_header_value("factor size", usize::MAX)?;
    let feature_count = reader.next_header_value("feature count", usize::MAX)?;
    let shape = ModelShape::new(degree, factor_size, feature_count);
    match shape.checked_parameter_count() {
        Some(count) if count <= consts::MAX_MODEL_PARAMETERS => {}
        _ => {
            return Err(FmError::ModelFormat {
                line: 3,
                reason: format!(
                    "degree {}, factor size {} and {} features exceed {} parameters",
                    degree,
                    factor_size,
                    feature_count,
                    consts::MAX_MODEL_PARAMETERS
                ),
            })
        }
    }

    let mut weights = Parameters::zeroed(shape);
    weights.w0 = reader.next_weight("bias")?;
    for w in weights.w.iter_mut() {
        *w = reader.next_weight("weight")?;
    }
    for d in shape.interaction_degrees() {
        for v in weights.v.slab_mut(d).iter_mut() {
            *v = reader.next_weight("factor")?;
        }
    }
    Ok(weights)
}
