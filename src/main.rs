use env_logger::{Builder, Env};
use handstaff::{CanvasOptions, LayoutContext, RawCanvasOptions};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

const USAGE: &str =
    "Usage: handstaff [--seed N] [--options FILE.yaml] (parse|repair|validate|layout|generate) [ANNOTATION]";

fn main() {
    Builder::from_env(Env::default().default_filter_or(LevelFilter::Info.to_string())).init();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut seed: Option<u64> = None;
    let mut options_path: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    // Parse flags
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => {
                let value = iter.next().unwrap_or_default();
                match value.parse() {
                    Ok(s) => seed = Some(s),
                    Err(_) => fail(&format!("Invalid seed '{}'", value)),
                }
            }
            "--options" => match iter.next() {
                Some(path) => options_path = Some(path),
                None => fail(USAGE),
            },
            "-h" | "--help" => {
                println!("{}", USAGE);
                return;
            }
            _ => positional.push(arg),
        }
    }

    let Some(command) = positional.first().cloned() else {
        fail(USAGE);
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if command == "generate" {
        match handstaff::generate_random_annotation(&mut rng) {
            Ok(annotation) => println!("{}", annotation),
            Err(e) => fail(&format!("Generation error: {}", e)),
        }
        return;
    }

    let annotation = match positional.get(1) {
        Some(annotation) => annotation.clone(),
        None => read_stdin(),
    };

    match command.as_str() {
        "parse" => print_yaml(&handstaff::parse(&annotation)),
        "repair" => {
            let (repaired, warnings) = handstaff::repair_annotation(&annotation);
            for warning in &warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", repaired);
        }
        "validate" => match handstaff::validate_annotation(&annotation) {
            Ok(groups) => eprintln!("Valid annotation with {} groups", groups.len()),
            Err(e) => fail(&e.to_string()),
        },
        "layout" => {
            let options = load_options(options_path.as_deref());
            let mut ctx = LayoutContext::seeded(rng.gen());
            match handstaff::layout_annotation(&annotation, options, &mut ctx) {
                Ok(geometry) => print_yaml(&geometry),
                Err(e) => fail(&format!("Layout error: {}", e)),
            }
        }
        other => fail(&format!("Unknown command '{}'\n{}", other, USAGE)),
    }
}

fn load_options(path: Option<&str>) -> CanvasOptions {
    let Some(path) = path else {
        return CanvasOptions::default();
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail(&format!("Error reading file '{}': {}", path, e)),
    };
    match RawCanvasOptions::from_yaml(&content).and_then(|raw| CanvasOptions::default().merge(&raw)) {
        Ok(options) => options,
        Err(e) => fail(&format!("Error in '{}': {}", path, e)),
    }
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        fail(&format!("Error reading stdin: {}", e));
    }
    input
}

fn print_yaml<T: Serialize>(value: &T) {
    match serde_yaml::to_string(value) {
        Ok(yaml) => print!("{}", yaml),
        Err(e) => fail(&format!("Error writing YAML: {}", e)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
