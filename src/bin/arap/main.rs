//! arap CLI - ARAP deformation of procedural meshes.
//!
//! Usage: arap <COMMAND> [OPTIONS]
//!
//! Run `arap --help` for available commands. Set `RUST_LOG=debug` to see
//! solver diagnostics.

use std::time::Instant;

use clap::{Parser, Subcommand};
use nalgebra::{Point3, Vector3};

use arapmesh::prelude::{ArapOptions, ArapSolver, Constraints, WeightPolicy};
use arapmesh::shapes;

#[derive(Parser)]
#[command(name = "arap")]
#[command(author, version, about = "As-Rigid-As-Possible deformation demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use single-threaded rotation fitting
    #[arg(long, global = true)]
    sequential: bool,

    /// Keep negative cotangent weights instead of clamping them
    #[arg(long, global = true)]
    raw_weights: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bend a strip into a circular arc
    Bend {
        /// Number of cells along the strip
        #[arg(short, long, default_value = "16")]
        segments: usize,

        /// Bend angle in degrees
        #[arg(short, long, default_value = "90")]
        angle: f64,

        /// Number of local/global rounds
        #[arg(short, long, default_value = "10")]
        iterations: usize,
    },

    /// Drag one side of a grid while the other side stays put
    Translate {
        /// Cells along x
        #[arg(long, default_value = "8")]
        nx: usize,

        /// Cells along y
        #[arg(long, default_value = "8")]
        ny: usize,

        /// Translation along x
        #[arg(long, default_value = "0.0")]
        dx: f64,

        /// Translation along y
        #[arg(long, default_value = "0.0")]
        dy: f64,

        /// Translation along z
        #[arg(long, default_value = "0.5")]
        dz: f64,

        /// Number of local/global rounds
        #[arg(short, long, default_value = "10")]
        iterations: usize,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ArapOptions::default().with_parallel(!cli.sequential);
    if cli.raw_weights {
        options = options.with_weight_policy(WeightPolicy::Raw);
    }

    match cli.command {
        Commands::Bend {
            segments,
            angle,
            iterations,
        } => cmd_bend(options, segments, angle, iterations)?,

        Commands::Translate {
            nx,
            ny,
            dx,
            dy,
            dz,
            iterations,
        } => cmd_translate(options, nx, ny, Vector3::new(dx, dy, dz), iterations)?,
    }

    Ok(())
}

fn cmd_bend(
    options: ArapOptions,
    segments: usize,
    angle: f64,
    iterations: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let length = segments as f64;
    let (vertices, triangles) = shapes::strip(segments, 1.0, length)?;
    println!("Strip: {} vertices, {} triangles", vertices.len(), triangles.len());

    let theta = angle.to_radians();
    let bend = |p: &Point3<f64>| -> Point3<f64> {
        if theta.abs() < 1e-12 {
            return *p;
        }
        let r = length / theta;
        let phi = p.x / r;
        Point3::new(r * phi.sin(), p.y, r * (1.0 - phi.cos()))
    };

    // The first two vertex pairs stay at rest; the last two follow the arc.
    let n = vertices.len();
    let mut constraints = Constraints::new();
    for v in (0..4).chain(n - 4..n) {
        constraints.push(v, bend(&vertices[v]));
    }

    println!("Bending by {:.1} degrees ({} handles)...", angle, constraints.len());
    let positions = run_rounds(options, &vertices, &triangles, &constraints, iterations)?;

    let arc_error = positions
        .iter()
        .zip(&vertices)
        .map(|(p, q)| (p - bend(q)).norm())
        .fold(0.0_f64, f64::max);
    println!("Max distance to ideal arc: {:.6}", arc_error);

    Ok(())
}

fn cmd_translate(
    options: ArapOptions,
    nx: usize,
    ny: usize,
    shift: Vector3<f64>,
    iterations: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let (vertices, triangles) = shapes::grid(nx, ny, 1.0 / nx.max(1) as f64)?;
    println!("Grid: {} vertices, {} triangles", vertices.len(), triangles.len());

    let mut constraints = Constraints::new();
    for j in 0..=ny {
        let fixed = shapes::grid_index(nx, 0, j);
        let moved = shapes::grid_index(nx, nx, j);
        constraints.push(fixed, vertices[fixed]);
        constraints.push(moved, vertices[moved] + shift);
    }

    println!(
        "Translating {} handles by ({:.3}, {:.3}, {:.3})...",
        ny + 1,
        shift.x,
        shift.y,
        shift.z
    );
    run_rounds(options, &vertices, &triangles, &constraints, iterations)?;

    Ok(())
}

/// Run single local/global rounds, reporting energy and edge distortion after
/// each, and return the final positions.
fn run_rounds(
    options: ArapOptions,
    vertices: &[Point3<f64>],
    triangles: &[[usize; 3]],
    constraints: &Constraints,
    iterations: usize,
) -> Result<Vec<Point3<f64>>, Box<dyn std::error::Error>> {
    let mode = if options.parallel { "parallel" } else { "sequential" };
    let mut solver = ArapSolver::with_options(options.with_iterations(1));

    let start = Instant::now();
    solver.init(vertices, triangles)?;
    solver.set_handles(&constraints.handle_mask(vertices.len())?)?;
    println!("Precomputed and factored in {:.2?} ({})", start.elapsed(), mode);

    let mut positions = vertices.to_vec();
    constraints.apply_targets(&mut positions)?;

    let start = Instant::now();
    for round in 1..=iterations {
        solver.compute_deformation(&mut positions)?;
        let energy = solver.energy(&positions)?;
        let distortion = max_edge_distortion(&solver, &positions);
        println!(
            "  round {:3}: energy {:.6e}, max edge distortion {:.4}%",
            round,
            energy,
            distortion * 100.0
        );
    }
    println!("Solved in {:.2?}", start.elapsed());

    Ok(positions)
}

/// Largest relative change of an edge length between rest and `positions`.
fn max_edge_distortion(solver: &ArapSolver, positions: &[Point3<f64>]) -> f64 {
    let rest = solver.rest_vertices();
    let mut worst = 0.0_f64;
    for i in 0..rest.len() {
        for &j in solver.one_ring(i).iter().filter(|&&j| j > i) {
            let before = (rest[i] - rest[j]).norm();
            let after = (positions[i] - positions[j]).norm();
            if before > 0.0 {
                worst = worst.max((after - before).abs() / before);
            }
        }
    }
    worst
}
