//! Level index builder: partitions AMR levels into dense-leaf kd-trees.
//!
//! Usage: cargo run --release --bin build_level_index -- --input <FILE> [OPTIONS]
//!
//! Options:
//!   --input <FILE>      Raw hexahedron file (16-byte records)
//!   --level <N>         Build only this level (default: every level)
//!   --config <FILE>     JSON build configuration
//!   --jobs <N>          Worker threads (default: rayon's choice)
//!   --spheres <FILE>    Write per-voxel sphere/colour buffers of the built level(s)
//!   --ramp              Colour leaves along the palette ramp instead of cycling
//!   --summary <FILE>    Write a JSON summary of every built index

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::json;

use amr_kdtree::amr::import_file;
use amr_kdtree::core::Result;
use amr_kdtree::geometry::SphereBuffers;
use amr_kdtree::kdtree::{build_all, BuildConfig, PartitionBuilder, SpatialIndex};

fn main() {
    amr_kdtree::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return;
    }

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let Some(input) = parse_str_arg(args, "--input").map(PathBuf::from) else {
        print_help();
        std::process::exit(2);
    };
    let level = parse_u32_arg(args, "--level");
    let config = match parse_str_arg(args, "--config") {
        Some(path) => BuildConfig::from_json_file(Path::new(&path))?,
        None => BuildConfig::default(),
    };

    if let Some(jobs) = parse_usize_arg(args, "--jobs") {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            log::warn!("Could not configure thread pool: {}", e);
        }
    }

    let data = import_file(&input)?;

    let start = Instant::now();
    let indices: BTreeMap<u32, SpatialIndex> = match level {
        Some(level) => {
            let index = PartitionBuilder::new(config.clone()).build(&data, level)?;
            BTreeMap::from([(level, index)])
        }
        None => build_all(&data, &config)?,
    };
    log::info!("Built {} level index(es) in {:.2}s", indices.len(), start.elapsed().as_secs_f64());

    for (level, index) in &indices {
        println!(
            "Level {:>2}: {:>10} voxels  {:>8} leaves  {:>8} nodes  depth {}",
            level, index.voxel_count(), index.leaf_count(), index.nodes().len(), index.depth()
        );
    }

    if let Some(path) = parse_str_arg(args, "--spheres") {
        let cyclic = !args.iter().any(|a| a == "--ramp");
        let mut out = BufWriter::new(std::fs::File::create(&path)?);
        let mut total = 0;
        for index in indices.values() {
            let buffers = SphereBuffers::from_index(index, cyclic);
            total += buffers.len();
            buffers.write_raw(&mut out)?;
        }
        log::info!("Wrote {} spheres to {}", total, path);
    }

    if let Some(path) = parse_str_arg(args, "--summary") {
        let summary = json!({
            "input": input.display().to_string(),
            "amr_origin": data.amr_origin.to_array(),
            "cell_scale": data.cell_scale,
            "config": config,
            "levels": indices.iter().map(|(level, index)| {
                let d = index.descriptor();
                let world = index.world_bounds();
                json!({
                    "level": level,
                    "cell_width": d.cell_width,
                    "bounds": { "lower": d.bounds.lower.to_array(), "upper": d.bounds.upper.to_array() },
                    "world_bounds": { "min": world.min.to_array(), "max": world.max.to_array() },
                    "voxels": index.voxel_count(),
                    "leaves": index.leaf_count(),
                    "nodes": index.nodes().len(),
                    "depth": index.depth(),
                })
            }).collect::<Vec<_>>(),
        });
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        log::info!("Wrote summary to {}", path);
    }

    Ok(())
}

fn print_help() {
    println!("AMR Level Index Builder");
    println!("=======================");
    println!();
    println!("Usage: build_level_index --input <FILE> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --input <FILE>     Raw hexahedron file (16-byte records)");
    println!("  --level <N>        Build only this level (default: all levels)");
    println!("  --config <FILE>    JSON build configuration");
    println!("  --jobs <N>         Worker threads");
    println!("  --spheres <FILE>   Write per-voxel sphere and colour buffers");
    println!("  --ramp             Colour leaves along the palette ramp");
    println!("  --summary <FILE>   Write a JSON summary");
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
