use std::env;
use std::fmt::{Display, LowerExp};
use std::io::{stdin, BufRead};
use std::process::exit;
use std::str::FromStr;
use std::time::Instant;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

#[cfg(feature = "arbitrary-precision")]
use complex_fitting::BigFloat;
use complex_fitting::{
    enumerate_pade_coefficients, max_absolute_error, max_relative_error, pade_solver,
    BinaryFloat, Complex, ComplexVector, Fitter, PadeFitter, PolynomialFitter,
};

fn parse<T: FromStr>(s: &str) -> Option<T> {
    if let Ok(v) = s.parse() {
        Some(v)
    } else {
        eprintln!("Failed to parse value {s:?}");
        None
    }
}
/// `re,im` or only `re`.
fn parse_complex<T: BinaryFloat + FromStr>(s: &str) -> Option<Complex<T>> {
    let (re, im) = s.split_once(',').unwrap_or((s, "0"));
    Some(Complex::new(parse(re.trim())?, parse(im.trim())?))
}

#[cfg(feature = "pretty")]
fn heading(s: &str) -> String {
    use colored::Colorize;
    s.bold().to_string()
}
#[cfg(not(feature = "pretty"))]
fn heading(s: &str) -> String {
    s.to_owned()
}
#[cfg(feature = "pretty")]
fn report_error(err: impl Display) {
    use colored::Colorize;
    eprintln!("{} {err}", "error:".red().bold());
}
#[cfg(not(feature = "pretty"))]
fn report_error(err: impl Display) {
    eprintln!("error: {err}");
}

fn complex<T: LowerExp>(c: &Complex<T>, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.p$e} {:+.p$e}i", c.re, c.im),
        None => format!("{:e} {:+e}i", c.re, c.im),
    }
}
fn real<T: LowerExp>(v: &T, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{v:.p$e}"),
        None => format!("{v:e}"),
    }
}

/// Reads lines of numbers until an empty line. Exits when the input ends.
fn input<T: FromStr>(
    _is_tty: bool,
    debug_performance: bool,
    _last_prompt: &mut Instant,
) -> Option<Vec<Vec<T>>> {
    #[cfg(feature = "pretty")]
    {
        if _is_tty {
            use std::io::{stdout, Write};

            print!("> ");
            let _ = stdout().lock().flush();
        }
        *_last_prompt = Instant::now();
    }

    let mut now = Instant::now();
    let mut values = Vec::with_capacity(8);
    let mut lines = 0_usize;
    for line in stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if lines == 0 {
            now = Instant::now();
        }
        lines += 1;
        if line.trim().is_empty() {
            break;
        }
        let current: Vec<T> = line
            .split(',')
            .flat_map(|segment| segment.split_whitespace())
            .filter_map(|value| parse(value))
            .collect();
        values.push(current);
        #[cfg(feature = "pretty")]
        {
            if _is_tty && _last_prompt.elapsed().as_millis() > 10 {
                use std::io::{stdout, Write};

                let next = values.len() + 1;
                print!("{next} > ");
                let _ = stdout().lock().flush();
            }
            *_last_prompt = Instant::now();
        }
    }
    if lines <= 1 && values.is_empty() {
        exit(0);
    }

    if values.is_empty() {
        eprintln!("Only invalid input. Try again.");
        return None;
    }
    if debug_performance {
        println!("Parsing/reading input took {}µs", now.elapsed().as_micros());
    }
    Some(values)
}

struct Data<T: BinaryFloat> {
    x: Vec<Complex<T>>,
    y: Vec<Complex<T>>,
    weights: Option<Vec<T>>,
}
/// Lines of `x_re x_im y_re y_im`, each with a trailing weight or none of them.
fn samples<T: BinaryFloat>(lines: Vec<Vec<T>>) -> Result<Data<T>, String> {
    let weighted = lines.first().map_or(false, |line| line.len() == 5);
    let width = if weighted { 5 } else { 4 };
    let mut data = Data {
        x: Vec::with_capacity(lines.len()),
        y: Vec::with_capacity(lines.len()),
        weights: weighted.then(|| Vec::with_capacity(lines.len())),
    };

    for (i, mut line) in lines.into_iter().enumerate() {
        if line.len() != width {
            return Err(format!(
                "line {}: expected {width} values, got {}",
                i + 1,
                line.len()
            ));
        }
        if let Some(weights) = &mut data.weights {
            weights.extend(line.pop());
        }
        let Ok([x_re, x_im, y_re, y_im]) = <[T; 4]>::try_from(line) else {
            return Err(format!("line {}: expected {width} values", i + 1));
        };
        data.x.push(Complex::new(x_re, x_im));
        data.y.push(Complex::new(y_re, y_im));
    }
    Ok(data)
}

fn print_fit<T: BinaryFloat + LowerExp>(
    fitter: &impl Fitter<T>,
    parameters: &ComplexVector<T>,
    precision: Option<usize>,
) -> Result<(), String> {
    let regressed = fitter
        .regress_all(fitter.x(), parameters)
        .map_err(|err| err.to_string())?;
    let cost = fitter.cost(parameters).map_err(|err| err.to_string())?;
    let absolute = max_absolute_error(fitter.y(), &regressed).map_err(|err| err.to_string())?;
    let relative = max_relative_error(fitter.y(), &regressed).map_err(|err| err.to_string())?;

    println!(
        "Cost: {}, max absolute error: {}, max relative error: {}",
        real(&cost, precision),
        real(&absolute, precision),
        real(&relative, precision)
    );
    Ok(())
}
fn print_pairs<T: BinaryFloat + LowerExp>(
    parameters: &ComplexVector<T>,
    m: usize,
    n: usize,
    precision: Option<usize>,
) -> Result<(), String> {
    let pairs = enumerate_pade_coefficients(parameters, m, n).map_err(|err| err.to_string())?;
    println!("{}", heading("Numerator, denominator"));
    for (k, (numer, denom)) in pairs.iter().enumerate() {
        println!(
            "x^{k}: {}, {}",
            complex(numer, precision),
            complex(denom, precision)
        );
    }
    Ok(())
}

fn polynomial<T: BinaryFloat + FromStr + LowerExp>(
    config: &ArgMatches,
    lines: Vec<Vec<T>>,
    precision: Option<usize>,
) -> Result<(), String> {
    let data = samples(lines)?;
    let degree = config.get_one::<usize>("degree").copied().unwrap_or(1);
    let intercept = intercept(config)?;

    let mut fitter = PolynomialFitter::new(&data.x, &data.y, degree, intercept)
        .map_err(|err| err.to_string())?;
    let parameters = fitter
        .fit(data.weights.as_deref())
        .map_err(|err| err.to_string())?;

    println!("{}", heading("Coefficients"));
    for (k, c) in parameters.iter().enumerate() {
        println!("x^{k}: {}", complex(c, precision));
    }
    print_fit(&fitter, &parameters, precision)
}

fn pade<T: BinaryFloat + FromStr + LowerExp>(
    config: &ArgMatches,
    lines: Vec<Vec<T>>,
    precision: Option<usize>,
) -> Result<(), String> {
    let data = samples(lines)?;
    let numer = config.get_one::<usize>("numer").copied().unwrap_or(2);
    let denom = config.get_one::<usize>("denom").copied().unwrap_or(2);
    let intercept = intercept(config)?;
    let norm_cost = config
        .get_one::<String>("norm_cost")
        .map(|s| parse::<T>(s).ok_or_else(|| format!("invalid norm cost {s:?}")))
        .transpose()?;

    let mut fitter = PadeFitter::new(&data.x, &data.y, numer, denom, intercept)
        .map_err(|err| err.to_string())?;
    let parameters = fitter
        .fit(data.weights.as_deref(), norm_cost)
        .map_err(|err| err.to_string())?;

    print_pairs(&parameters, numer, denom, precision)?;
    print_fit(&fitter, &parameters, precision)
}

fn series<T: BinaryFloat + FromStr + LowerExp>(
    config: &ArgMatches,
    lines: Vec<Vec<T>>,
    precision: Option<usize>,
) -> Result<(), String> {
    let m = config.get_one::<usize>("m").copied().unwrap_or(0);
    let n = config.get_one::<usize>("n").copied().unwrap_or(0);
    let coefficients = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| match <[T; 2]>::try_from(line) {
            Ok([re, im]) => Ok(Complex::new(re, im)),
            Err(line) => Err(format!("line {}: expected 2 values, got {}", i + 1, line.len())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (numer, denom) = pade_solver::solve(&coefficients, m, n).map_err(|err| err.to_string())?;
    let parameters = numer.iter().chain(denom.iter()).cloned().collect::<Vec<_>>();

    print_pairs(&ComplexVector::from_vec(parameters), m + 1, n + 1, precision)
}

fn intercept<T: BinaryFloat + FromStr>(config: &ArgMatches) -> Result<Option<Complex<T>>, String> {
    config
        .get_one::<String>("intercept")
        .map(|s| parse_complex(s).ok_or_else(|| format!("invalid intercept {s:?}")))
        .transpose()
}

fn run<T: BinaryFloat + FromStr + LowerExp>(matches: &ArgMatches, debug_performance: bool) {
    #[cfg(feature = "pretty")]
    let tty = atty::is(atty::Stream::Stdin);
    #[cfg(not(feature = "pretty"))]
    let tty = false;

    let precision = matches.get_one::<usize>("precision").copied();
    let mut last_prompt = Instant::now();

    'main: loop {
        let Some(lines) = input::<T>(tty, debug_performance, &mut last_prompt) else {
            continue;
        };

        let now = Instant::now();
        let result = match matches.subcommand() {
            Some(("polynomial", config)) => polynomial(config, lines, precision),
            Some(("pade", config)) => pade(config, lines, precision),
            Some(("series", config)) => series(config, lines, precision),
            _ => unreachable!("invalid subcommand"),
        };
        if let Err(err) = result {
            report_error(err);
            continue 'main;
        }

        if debug_performance {
            println!("Fitting took {}µs", now.elapsed().as_micros());
        }
    }
}

fn intercept_arg() -> Arg {
    Arg::new("intercept")
        .short('i')
        .long("intercept")
        .help("Fix the constant coefficient to this value instead of fitting it. Given as `re,im` or `re`.")
}

fn main() {
    let mut app = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .after_help("Samples are read from stdin, one per line: `x_re x_im y_re y_im [weight]`. \
            Values are separated by commas or whitespace. An empty line fits the samples read so far.");

    app = app
        .arg(Arg::new("debug-performance")
            .short('p')
            .long("debug-performance")
            .action(ArgAction::SetTrue)
            .help("Print how long parsing and fitting took. Also enabled by the DEBUG_PERFORMANCE environment variable.")
        )
        .arg(Arg::new("precision")
            .short('n')
            .long("precision")
            .help("Digits printed after the decimal point. When this isn't set, all digits are printed.")
            .value_parser(value_parser!(usize))
        );

    #[cfg(feature = "arbitrary-precision")]
    {
        app = app.arg(Arg::new("bits")
            .short('b')
            .long("bits")
            .help("Compute with this many bits of precision instead of with 64-bit floats. \
                Use this for high orders, where the normal equations become ill-conditioned.")
            .value_parser(value_parser!(u32).range(2..))
        );
    }

    app = app
        .subcommand(Command::new("polynomial")
            .about("Fit a polynomial to the samples by weighted least squares.")
            .arg(Arg::new("degree")
                .short('d')
                .long("degree")
                .help("Degree of polynomial.")
                .required(true)
                .value_parser(value_parser!(usize))
            )
            .arg(intercept_arg())
        )
        .subcommand(Command::new("pade")
            .about("Fit a rational function (Padé approximant) to the samples by linearised weighted least squares.")
            .arg(Arg::new("numer")
                .short('n')
                .long("numer")
                .help("Count of numerator coefficients, at least 2.")
                .required(true)
                .value_parser(value_parser!(usize))
            )
            .arg(Arg::new("denom")
                .short('d')
                .long("denom")
                .help("Count of denominator coefficients (including the constant 1), at least 2.")
                .required(true)
                .value_parser(value_parser!(usize))
            )
            .arg(intercept_arg())
            .arg(Arg::new("norm_cost")
                .short('c')
                .long("norm-cost")
                .help("Ridge regularisation of the coefficients, relative to the sum of weights.")
            )
        )
        .subcommand(Command::new("series")
            .about("Compute the [m/n] Padé approximant of a power series. \
                Reads `m + n + 1` coefficients, `re im` per line, constant term first.")
            .arg(Arg::new("m")
                .short('m')
                .help("Degree of numerator.")
                .required(true)
                .value_parser(value_parser!(usize))
            )
            .arg(Arg::new("n")
                .short('n')
                .help("Degree of denominator.")
                .required(true)
                .value_parser(value_parser!(usize))
            )
        );

    #[cfg(feature = "completion")]
    let app = clap_autocomplete::add_subcommand(app);
    #[cfg(feature = "completion")]
    let command_copy = app.clone();

    let matches = app.get_matches();

    #[cfg(feature = "completion")]
    {
        if let Some(result) = clap_autocomplete::test_subcommand(&matches, command_copy) {
            if let Err(err) = result {
                eprintln!("Insufficient permissions: {err}");
                exit(1);
            } else {
                exit(0);
            }
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let debug_performance = env::var("DEBUG_PERFORMANCE").ok().map_or_else(
        || matches.get_flag("debug-performance"),
        |s| !s.trim().is_empty(),
    );

    #[cfg(feature = "arbitrary-precision")]
    {
        if let Some(&bits) = matches.get_one::<u32>("bits") {
            complex_fitting::set_default_precision(bits);
            run::<BigFloat>(&matches, debug_performance);
            return;
        }
    }
    run::<f64>(&matches, debug_performance);
}
