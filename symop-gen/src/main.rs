use env_logger::Env;
use log::info;
use std::process;
use symop_compute::{backprop, emit::Kernel, jacobian, ops, Lowering, Node, Registry, Target, Type};
use symop_error::Error;

/// The independent variables of the pose: a translation and three Euler angles.
const POSE_VARIABLES: [&str; 6] = ["x", "y", "z", "a", "b", "c"];

/// Lowers the outputs with one shared lowering and collects them into a kernel.
fn lowered_kernel(registry: &Registry, outputs: Vec<(String, Node)>) -> Result<Kernel, Error> {
    let mut lowering = Lowering::new(registry);
    let mut kernel = Kernel::new();
    for (name, node) in outputs {
        kernel.push(name, lowering.lower(&node)?);
    }
    Ok(kernel)
}

/// Builds the generated kernels, in the order they are written.
fn kernels(registry: &Registry) -> Result<Vec<(&'static str, Kernel)>, Error> {
    let leaves = POSE_VARIABLES.map(|name| Node::leaf(name, Type::Scalar));

    // T(x, y, z) Rz(c) Ry(b) Rx(a)
    let translation = registry.apply("mat44Translation", &leaves[..3])?;
    let rotation = [("mat44RotationZ", 5), ("mat44RotationY", 4), ("mat44RotationX", 3)]
        .into_iter()
        .try_fold(Node::one(Type::Mat44), |acc, (name, index)| {
            let factor = registry.apply(name, &[leaves[index].clone()])?;
            registry.apply("*", &[acc, factor])
        })?;
    let pose = registry.apply("*", &[translation, rotation])?;

    let point = Node::leaf("p", Type::Vec4);
    let moved = registry.apply("*", &[pose.clone(), point])?;
    let cartesian = registry.apply("fromHomo", &[moved.clone()])?;

    let columns = jacobian(registry, &pose, &leaves)?;
    let derivatives = POSE_VARIABLES
        .iter()
        .zip(columns)
        .map(|(name, derivative)| (format!("dpose_d{}", name), derivative))
        .collect();

    let weights = Node::leaf("w", Type::Vec4);
    let loss = registry.apply("dot", &[weights, moved])?;
    let gradients = backprop(registry, &loss, &leaves)?;
    let mut loss_outputs = vec![("loss".to_string(), loss)];
    loss_outputs.extend(
        POSE_VARIABLES
            .iter()
            .zip(&leaves)
            .map(|(name, leaf)| (format!("dloss_d{}", name), gradients.gradient_or_zero(leaf))),
    );

    let heading = registry.apply("mat33RotationZ", &[leaves[5].clone()])?;
    let direction = registry.apply("*", &[heading, Node::leaf("v", Type::Vec3)])?;

    Ok(vec![
        ("pose", lowered_kernel(registry, vec![
            ("pose".to_string(), pose),
            ("cartesian".to_string(), cartesian),
        ])?),
        ("pose_jacobian", lowered_kernel(registry, derivatives)?),
        ("pose_gradient", lowered_kernel(registry, loss_outputs)?),
        ("heading", lowered_kernel(registry, vec![("direction".to_string(), direction)])?),
    ])
}

/// Writes every kernel to stdout in the named target.
fn run(target: &str) -> Result<(), Error> {
    let target = target.parse::<Target>()?;
    let registry = ops::standard_registry()?;

    for (name, kernel) in kernels(registry)? {
        info!("writing kernel `{}` with {} outputs", name, kernel.outputs().len());
        println!("// {}", name);
        print!("{}", kernel.to_source(target)?);
        println!();
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let target = std::env::args().nth(1).unwrap_or_else(|| Target::C.name().to_string());
    if let Err(err) = run(&target) {
        let _ = err.report_to_stderr("symop-gen");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernels_emit_for_every_target() {
        let registry = ops::standard().unwrap();
        let kernels = kernels(&registry).unwrap();
        assert_eq!(kernels.len(), 4);

        for target in Target::ALL {
            for (_, kernel) in &kernels {
                let source = kernel.to_source(target).unwrap();
                for (output, _) in kernel.outputs() {
                    assert!(source.contains(&format!(" {} = ", output)), "missing `{}`", output);
                }
            }
        }
    }

    #[test]
    fn gradient_covers_every_variable() {
        let registry = ops::standard().unwrap();
        let kernels = kernels(&registry).unwrap();
        let (_, gradient) = &kernels[2];
        let names = gradient.outputs().iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["loss", "dloss_dx", "dloss_dy", "dloss_dz", "dloss_da", "dloss_db", "dloss_dc"]);
    }

    #[test]
    fn unknown_target() {
        assert!(run("glsl").is_err());
    }
}
