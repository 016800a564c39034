//! an executable computing a kernel matrix on a TU dataset
//! example usage:
//! kernel --dir "/home/data/TU" --name MUTAG --spec wl.json --normalize --njobs 4 --output mutag
//!
//! The spec file holds a kernel spec or a pipeline of kernel specs in json, for example
//! `[{"name": "weisfeiler_lehman", "n_iter": 5}, {"name": "subtree_wl"}]`.
//! With --test-fraction f, a fraction f of the graphs (chosen with --seed) is kept out of the fit,
//! the train kernel matrix goes to the output file and the test one (n_test, n_train) to the file suffixed by _test.

use std::path::Path;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgMatches, Command};
use cpu_time::ProcessTime;
use rand::seq::SliceRandom;
use std::time::SystemTime;

use graphkern::kernels::make_rng;
use graphkern::prelude::*;

struct CliArgs {
    dir: String,
    name: String,
    spec_file: String,
    params: GraphKernelParams,
    test_fraction: Option<f64>,
    output: Option<String>,
}

fn parse_value<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> anyhow::Result<Option<T>> {
    match matches.value_of(name) {
        Some(str) => match str.parse::<T>() {
            Ok(val) => Ok(Some(val)),
            _ => Err(anyhow!("error parsing {}, got {}", name, str)),
        },
        None => Ok(None),
    }
}

fn parse_args(matches: &ArgMatches) -> anyhow::Result<CliArgs> {
    log::debug!("in parse_args");
    let dir = matches.value_of("dir").ok_or_else(|| anyhow!("no dataset directory"))?.to_string();
    let name = matches.value_of("name").ok_or_else(|| anyhow!("no dataset name"))?.to_string();
    let spec_file = matches.value_of("spec").ok_or_else(|| anyhow!("no kernel spec file"))?.to_string();
    //
    let mut params = GraphKernelParams::default().with_normalize(matches.is_present("normalize"));
    if let Some(rank) = parse_value::<usize>(matches, "nystroem")? {
        params = params.with_nystroem(rank);
    }
    if let Some(n_jobs) = parse_value::<i32>(matches, "njobs")? {
        params = params.with_n_jobs(n_jobs);
    }
    if let Some(seed) = parse_value::<u64>(matches, "seed")? {
        params = params.with_random_state(seed);
    }
    let test_fraction = parse_value::<f64>(matches, "test_fraction")?;
    if let Some(f) = test_fraction {
        if !(0. ..1.).contains(&f) {
            return Err(anyhow!("test fraction must be in [0, 1), got {}", f));
        }
    }
    let output = matches.value_of("output").map(|s| s.to_string());
    Ok(CliArgs {
        dir,
        name,
        spec_file,
        params,
        test_fraction,
        output,
    })
} // end of parse_args

fn run(args: CliArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.spec_file)
        .with_context(|| format!("could not read spec file {}", args.spec_file))?;
    let mut gk = GraphKernel::from_json(&json, args.params.clone())?;
    let dataset = read_tudataset(Path::new(&args.dir), &args.name)?;
    if dataset.is_empty() {
        return Err(anyhow!("empty dataset"));
    }
    let output = Output::new(Format::Csv, &args.output);
    //
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    match args.test_fraction {
        Some(fraction) if fraction > 0. => {
            let mut indices: Vec<usize> = (0..dataset.len()).collect();
            indices.shuffle(&mut make_rng(args.params.get_random_state()));
            let nb_test = ((dataset.len() as f64) * fraction).round() as usize;
            let nb_test = nb_test.min(dataset.len() - 1);
            let (test_idx, train_idx) = indices.split_at(nb_test);
            let train: Vec<Graph> = train_idx.iter().map(|i| dataset.data[*i].clone()).collect();
            let test: Vec<Graph> = test_idx.iter().map(|i| dataset.data[*i].clone()).collect();
            log::info!("train size : {}, test size : {}", train.len(), test.len());
            let k_train = gk.fit_transform(&train)?;
            output.dump(&k_train)?;
            if !test.is_empty() {
                let k_test = gk.transform(&test)?;
                let test_name = output.get_output_name().trim_end_matches(".csv").to_string() + "_test.csv";
                dump_kernel_matrix(Path::new(&test_name), &k_test)?;
            }
        }
        _ => {
            let km = gk.fit_transform(&dataset.data)?;
            output.dump(&km)?;
        }
    }
    log::info!(
        "kernel {} computed, sys time(ms) {:?} cpu time(ms) {:?}",
        gk.name(),
        sys_start.elapsed().unwrap_or_default().as_millis(),
        cpu_start.elapsed().as_millis()
    );
    Ok(())
} // end of run

pub fn main() {
    //
    let _ = env_logger::builder().try_init();
    log::info!("logger initialized");
    //
    let matches = Command::new("kernel")
        .arg_required_else_help(true)
        .arg(
            Arg::new("dir")
                .long("dir")
                .takes_value(true)
                .required(true)
                .help("directory of the dataset"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .takes_value(true)
                .required(true)
                .help("dataset name, files are NAME_A.txt, NAME_graph_indicator.txt ..."),
        )
        .arg(
            Arg::new("spec")
                .long("spec")
                .takes_value(true)
                .required(true)
                .help("json file with the kernel spec or pipeline"),
        )
        .arg(Arg::new("normalize").long("normalize").help("normalize the kernel matrix"))
        .arg(
            Arg::new("nystroem")
                .long("nystroem")
                .takes_value(true)
                .help("rank of the Nystroem approximation"),
        )
        .arg(
            Arg::new("njobs")
                .long("njobs")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("number of threads, -1 for all cpus"),
        )
        .arg(Arg::new("seed").long("seed").takes_value(true).help("random seed"))
        .arg(
            Arg::new("test_fraction")
                .long("test-fraction")
                .takes_value(true)
                .help("fraction of graphs kept out of the fit"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .takes_value(true)
                .help("output file, default kernel.csv"),
        )
        .get_matches();
    //
    let args = match parse_args(&matches) {
        Ok(args) => args,
        Err(e) => {
            log::error!("error parsing arguments : {:?}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run(args) {
        log::error!("kernel computation failed : {:?}", e);
        std::process::exit(1);
    }
} // end of main
