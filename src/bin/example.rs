//! UMAT Driver Example - Uniaxial Stretch of a Hexahedral Block
//!
//! Usage: umat-example [driver-config.json]
//!
//! Without a configuration the built-in isotropic elastic routine is used
//! with steel-like constants.

use anyhow::{bail, Context};
use umat_driver::prelude::*;

const STEPS: usize = 5;
const STRAIN_PER_STEP: f64 = 2e-3;

fn default_config() -> DriverConfig {
    DriverConfig {
        options: UpdateOptions::default(),
        material: MaterialInput {
            props: ValueSource::Inline(vec![200e3, 0.3]),
            state: ValueSource::Inline(vec![0.0]),
            num_props: 2,
            num_state_vars: 1,
            orientation: None,
        },
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => DriverConfig::from_file(&path)
            .with_context(|| format!("reading driver configuration {}", path))?,
        None => default_config(),
    };
    let data = config.material.load().context("loading material input")?;

    println!("=== UMAT Driver Example: Uniaxial Stretch ===\n");

    // 4 x 2 x 2 block of unit hexahedra
    //
    //        +-------+-------+-------+-------+
    //       /       /       /       /       /|
    //      +-------+-------+-------+-------+ |  --> stretched along x
    //      |       |       |       |       | +
    //      +-------+-------+-------+-------+/
    //
    let geometry = ElementGeometry::structured_block(4, 2, 2, [4.0, 2.0, 2.0])?;
    let num_elements = geometry.num_elements();

    let material = UmatAdapter::new(
        IsotropicElasticUmat::new(),
        data.properties.clone(),
        data.state_layout.width(),
    )?;
    let mut driver = PointUpdateDriver::new(geometry, &Hex8::new(), material, config.options)?;

    let num_grains = config
        .material
        .orientation
        .as_ref()
        .map_or(1, |o| o.num_grains);
    let grains: Vec<usize> = (0..num_elements).map(|e| e % num_grains).collect();
    driver.initialize_state_variables(
        &data.state_layout,
        &data.initial_state,
        &data.orientations,
        &grains,
    )?;

    println!(
        "Mesh: {} elements, {} quadrature points",
        num_elements,
        driver.layout().total_points()
    );
    println!("Material: E = {:.3e}, nu = {}\n", data.properties[0], data.properties[1]);
    println!(
        "{:>4}  {:>8}  {:>10}  {:>12}  {:>12}  {:>12}",
        "step", "t", "strain", "sigma_xx", "sigma_yy", "von Mises"
    );

    let mut time = 0.0;
    let mut strain = 0.0;
    for _ in 0..STEPS {
        let mut dt = 1.0;
        let report = loop {
            let target = strain + STRAIN_PER_STEP * dt;
            let u: Vec<f64> = driver
                .geometry()
                .reference_coordinates()
                .chunks(3)
                .flat_map(|x| [target * x[0], 0.0, 0.0])
                .collect();

            driver.begin_step(time + dt, dt)?;
            match driver.update_points_from_displacement(&u) {
                Ok(report) if report.cutback_requested() => dt = report.suggested_dt(dt),
                Ok(report) => {
                    strain = target;
                    break report;
                }
                Err(e) if e.is_recoverable() => dt *= 0.5,
                Err(e) => return Err(e.into()),
            }
            if dt < 1e-6 {
                bail!("time step collapsed below 1e-6 at t = {}", time);
            }
        };
        driver.commit()?;
        time += dt;

        let stress = driver.stress(0, 0);
        let vm = driver.von_mises_field();
        let vm_max = vm.as_slice().iter().cloned().fold(0.0, f64::max);
        println!(
            "{:>4}  {:>8.3}  {:>10.3e}  {:>12.4}  {:>12.4}  {:>12.4}",
            driver.committed_steps(),
            time,
            strain,
            stress[0],
            stress[1],
            vm_max
        );
        log::debug!("step converged after {} iteration(s)", report.iteration);
    }

    let c = driver.tangent(0, 0);
    println!("\nTangent at element 0, point 0 (Voigt 11, 22, 33, 23, 13, 12):");
    for i in 0..6 {
        println!(
            "  [{:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1}]",
            c[(i, 0)],
            c[(i, 1)],
            c[(i, 2)],
            c[(i, 3)],
            c[(i, 4)],
            c[(i, 5)]
        );
    }

    Ok(())
}
