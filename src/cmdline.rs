use clap::{App, AppSettings, Arg};

pub fn parse<'a>() -> clap::ArgMatches<'a> {
    create_expected_args().get_matches()
}

fn value_arg<'a>(name: &'a str, value_name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .value_name(value_name)
        .help(help)
        .takes_value(true)
        // range checks happen in ModelInstance::validate(), so "-1" has to reach it
        .allow_hyphen_values(true)
}

pub fn create_expected_args<'a>() -> App<'a, 'a> {
    App::new("fm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("n-degree factorization machine, trained with mini-batch SGD")
        .setting(AppSettings::DeriveDisplayOrder)
        .arg(
            Arg::with_name("data")
                .short("d")
                .long("data")
                .value_name("filename")
                .help("Training or test data: label index:value ... (.gz and .zst are decompressed)")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("final_regressor")
                .short("f")
                .long("final_regressor")
                .value_name("filename")
                .help("Where to save the trained model (default: <data basename>.model)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("initial_regressor")
                .short("i")
                .long("initial_regressor")
                .value_name("filename")
                .help("Model to load, required with --testonly")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("testonly")
                .short("t")
                .long("testonly")
                .help("Score --data with --initial_regressor, do not train"),
        )
        .arg(
            Arg::with_name("predictions")
                .short("p")
                .long("predictions")
                .value_name("filename")
                .help("Where to write predictions in test mode (default: <data>.res)")
                .takes_value(true),
        )
        .arg(value_arg("fm_degree", "degree", "Degree of the FM, 1-10 (default 2)"))
        .arg(value_arg("factor_size", "k", "Size of the latent factors (default 3)"))
        .arg(value_arg(
            "regularization_factor",
            "factor",
            "Regularization coefficient (default 0)",
        ))
        .arg(value_arg("learning_rate", "rate", "Learning rate (default 0.01)"))
        .arg(
            Arg::with_name("partial_fm")
                .long("partial_fm")
                .help("Skip almost-always-zero features in interaction terms"),
        )
        .arg(value_arg(
            "init_std_dev",
            "stddev",
            "Standard deviation of the initial factors (default 0.1)",
        ))
        .arg(value_arg(
            "regularization_norm",
            "l1|l2",
            "Regularization norm (default l2)",
        ))
        .arg(value_arg("mini_batch_size", "n", "Mini-batch size (default 200)"))
        .arg(value_arg("iteration_count", "n", "Number of passes (default 200)"))
        .arg(value_arg("momentum", "factor", "Momentum for L2 updates (default 0)"))
        .arg(value_arg(
            "burn_in",
            "n",
            "Passes excluded from weight averaging (default 10)",
        ))
        .arg(value_arg("seed", "n", "Random seed for initialization and shuffling"))
}
