//! Builds a small synthetic tile in memory and runs the engines directly,
//! without a pipeline file.
//!
//! cargo run --example basic_usage

use pcdomain_core::{DimType, PointTable};
use pcdomain_filters::{
    assign, classify_by_distance, grid_decimation, DistanceParams, GridParams, KeepMode,
    Predicate, RadiusAssignOptions,
};

fn main() {
    let mut table = PointTable::new();
    let class = table.classification_dim();
    for i in 0..30 {
        for j in 0..30 {
            let x = i as f64 * 0.4 + j as f64 * 1e-4;
            let y = j as f64 * 0.4 + i as f64 * 1e-4;
            let roof = (10..16).contains(&i) && (10..16).contains(&j);
            let id = table.push_point(x, y, if roof { 8.0 } else { 0.1 * (i % 3) as f64 });
            table.set_field(class, id, if roof { 6u8 } else { 2u8 });
        }
    }

    // ground within 0.5 m of a roof point becomes class 20
    let report = classify_by_distance(
        &mut table,
        &DistanceParams {
            src_domain: 2,
            reference_domain: 6,
            distance_min: 0.0,
            distance_max: 0.5,
            new_class_value: 20,
            only_above: false,
        },
    );
    println!("reclassified {} of {} ground points", report.reclassified, report.visited);

    let reference = table.register_or_assign_dim("REF_DOMAIN", DimType::Unsigned8);
    let roofs = match Predicate::class_in(&[6]).resolve(table.layout()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    assign(&mut table, reference, 1.0, Some(&roofs));

    let opts = RadiusAssignOptions {
        src_domain: String::new(),
        radius: 1.0,
        max2d_below: 2.0,
        ..RadiusAssignOptions::default()
    };
    match opts.prepare(&mut table) {
        Ok(job) => {
            let report = job.run(&mut table);
            println!("{} points within 1 m of a roof, gated 2 m below", report.matched);
        }
        Err(e) => eprintln!("{e}"),
    }

    let out = table.register_or_assign_dim("grid", DimType::Unsigned8);
    let params = GridParams {
        edge: 2.0,
        mode: KeepMode::Max,
    };
    match grid_decimation(&mut table, &params, out, None) {
        Ok(outcome) => println!(
            "{} x {} grid keeps {} of {} points",
            outcome.grid.cols(),
            outcome.grid.rows(),
            outcome.kept,
            outcome.participants
        ),
        Err(e) => eprintln!("{e}"),
    }
}
