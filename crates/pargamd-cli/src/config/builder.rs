use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use crate::cli::GenerateArgs;
use crate::error::{CliError, Result};
use pargamd::core::cv::CvSpec;
use pargamd::engine::config::{ParameterRecord, ParameterRecordBuilder};
use std::str::FromStr;
use tracing::debug;

/// Loads the parameter file named by `args` and merges it with the command line.
pub fn build_record(args: &GenerateArgs) -> Result<ParameterRecord> {
    let file_config = FileConfig::from_file(&args.config)?;
    merge_with_cli(file_config, args)
}

/// Precedence: dedicated flags, then `--set` values, then the file.
///
/// Required parameters are only forwarded when one of those sources sets them,
/// so an omitted protein name or simulation length is reported as missing.
/// Defaults fill the optional settings alone.
pub fn merge_with_cli(file_config: FileConfig, args: &GenerateArgs) -> Result<ParameterRecord> {
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let simulation = file_config.simulation.take().unwrap_or_default();
    let scheduler = file_config.scheduler.take().unwrap_or_default();
    let cvs: Vec<CvSpec> = match file_config.cvs.take() {
        Some(cvs) => cvs.into_iter().map(Into::into).collect(),
        None => defaults.cvs,
    };

    let mut builder = ParameterRecordBuilder::new()
        .include_infinite_bounds(
            file_config
                .include_infinite_bounds
                .unwrap_or(defaults.include_infinite_bounds),
        )
        .rst_as_bstate(
            args.rst_as_bstate
                || file_config
                    .rst_as_bstate
                    .unwrap_or(defaults.rst_as_bstate),
        )
        .cvs(cvs)
        .scheduler(scheduler.into_options());

    if let Some(account) = file_config.account {
        builder = builder.account(account);
    }
    if let Some(email) = file_config.email {
        builder = builder.email(email);
    }
    if let Some(name) = file_config.protein_name {
        builder = builder.protein_name(name);
    }
    if let Some(count) = simulation.bin_target_counts {
        builder = builder.bin_target_counts(count);
    }
    if let Some(iterations) = simulation.max_total_iterations {
        builder = builder.max_total_iterations(iterations);
    }
    if let Some(nstlim) = simulation.nstlim {
        builder = builder.nstlim(nstlim);
    }
    if let Some(ntpr) = simulation.ntpr {
        builder = builder.ntpr(ntpr);
    }
    if let Some(enable) = args
        .gpu
        .as_override()
        .or(file_config.enable_gpu_parallelization)
    {
        builder = builder.enable_gpu_parallelization(enable);
    }

    let record = builder.build()?;
    debug!("Final parameter record: {:?}", record);
    Ok(record)
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Override(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Override(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "account" => config.account = Some(value_str.to_string()),
            "email" => config.email = Some(value_str.to_string()),
            "protein-name" => config.protein_name = Some(value_str.to_string()),
            "enable-gpu-parallelization" => {
                config.enable_gpu_parallelization = Some(parse_value(key, value_str, "boolean")?)
            }
            "include-infinite-bounds" => {
                config.include_infinite_bounds = Some(parse_value(key, value_str, "boolean")?)
            }
            "rst-as-bstate" => config.rst_as_bstate = Some(parse_value(key, value_str, "boolean")?),
            "simulation.bin-target-counts" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .bin_target_counts = Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.max-total-iterations" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .max_total_iterations = Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.nstlim" => {
                config.simulation.get_or_insert_with(Default::default).nstlim =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.ntpr" => {
                config.simulation.get_or_insert_with(Default::default).ntpr =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "scheduler.partition" => {
                config.scheduler.get_or_insert_with(Default::default).partition =
                    Some(value_str.to_string());
            }
            "scheduler.nodes" => {
                config.scheduler.get_or_insert_with(Default::default).nodes =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "scheduler.gpus" => {
                config.scheduler.get_or_insert_with(Default::default).gpus =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "scheduler.ntasks-per-node" => {
                config
                    .scheduler
                    .get_or_insert_with(Default::default)
                    .ntasks_per_node = Some(parse_value(key, value_str, "integer")?);
            }
            "scheduler.memory" => {
                config.scheduler.get_or_insert_with(Default::default).memory =
                    Some(value_str.to_string());
            }
            "scheduler.wall-time" => {
                config.scheduler.get_or_insert_with(Default::default).wall_time =
                    Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Override(format!(
                    "Unsupported key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
