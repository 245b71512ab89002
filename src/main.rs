use std::error::Error;
use std::path::Path;

use fm::consts;
use fm::dataset::SampleStore;
use fm::error::FmError;
use fm::evaluation::evaluate_to_filename;
use fm::model_instance::ModelInstance;
use fm::persistence::save_regressor_to_filename;
use fm::trainer::Trainer;
use fm::{cmdline, logging_layer};

fn main() {
    logging_layer::initialize_logging_layer();

    if let Err(e) = main_fm_loop() {
        log::error!("Global error: {}", e);
        std::process::exit(1)
    }
}

/// "<file name of data>.model" in the working directory
fn default_model_filename(data_filename: &str) -> String {
    let base = Path::new(data_filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(data_filename);
    format!("{}.{}", base, consts::MODEL_FILE_EXTENSION)
}

/// "<data>.res", next to the data
fn default_predictions_filename(data_filename: &str) -> String {
    format!("{}.{}", data_filename, consts::PREDICTIONS_FILE_EXTENSION)
}

fn main_fm_loop() -> Result<(), Box<dyn Error>> {
    // We'll parse once the command line into cl and then different objects will examine it
    let cl = cmdline::parse();
    let mi = ModelInstance::new_from_cmdline(&cl)?;
    let data_filename = cl
        .value_of("data")
        .ok_or_else(|| FmError::Configuration("--data expected".to_string()))?;

    if cl.is_present("testonly") {
        let model_filename = cl.value_of("initial_regressor").ok_or_else(|| {
            FmError::Configuration("--testonly requires --initial_regressor".to_string())
        })?;
        let predictions_filename = match cl.value_of("predictions") {
            Some(filename) => filename.to_string(),
            None => default_predictions_filename(data_filename),
        };
        log::info!("initial_regressor = {}", model_filename);
        evaluate_to_filename(&mi, model_filename, data_filename, &predictions_filename)?;
    } else {
        if cl.is_present("initial_regressor") {
            return Err(FmError::Configuration(
                "--initial_regressor is only used with --testonly".to_string(),
            )
            .into());
        }
        let final_regressor_filename = match cl.value_of("final_regressor") {
            Some(filename) => filename.to_string(),
            None => default_model_filename(data_filename),
        };
        log::info!("final_regressor = {}", final_regressor_filename);

        let store = SampleStore::from_filename(data_filename)?;
        let mut trainer = Trainer::new(mi, store)?;
        trainer.train()?;
        let re = trainer.into_regressor();
        save_regressor_to_filename(&final_regressor_filename, &re.weights)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_filename_drops_directories() {
        assert_eq!(default_model_filename("data/train.txt"), "train.txt.model");
        assert_eq!(default_model_filename("/tmp/a/b.gz"), "b.gz.model");
        assert_eq!(default_model_filename("train"), "train.model");
    }

    #[test]
    fn test_default_predictions_filename_keeps_directories() {
        assert_eq!(default_predictions_filename("data/test.txt"), "data/test.txt.res");
    }
}
