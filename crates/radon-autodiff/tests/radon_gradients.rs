//! Gradients through the Radon operator pair.

use approx::assert_relative_eq;
use proptest::prelude::*;
use radon_autodiff::prelude::*;
use radon_core::utils::{random_images, random_sinograms};
use radon_core::{AngleSet, ExecutionContext, Radon, Stack};
use std::collections::HashMap;
use std::sync::Arc;

fn setup(size: usize, num_angles: usize) -> (Arc<Radon>, AngleSet<f64>) {
    let radon = Arc::new(Radon::new(size, ExecutionContext::default()).unwrap());
    let angles = AngleSet::linspace(0.0, std::f64::consts::TAU, num_angles).unwrap();
    (radon, angles)
}

/// mean(backprojection(forward(x))) is differentiable with respect to x.
#[test]
fn test_differentiation() {
    let (radon, angles) = setup(64, 10);
    let graph = Graph::new();
    let x = graph.variable(Stack::zeros(&[1, 64, 64]).unwrap());

    let y = graph.radon_forward(x.id, &radon, &angles);
    let z = graph.radon_backprojection(y, &radon, &angles);
    let loss = graph.apply_op(Box::new(Mean), &[z]);

    let grads = backward(&graph, loss, None).unwrap();
    let grad_x = grads.get(&x.id).expect("gradient for x");
    assert_eq!(grad_x.shape(), vec![1, 64, 64]);
    assert!(grad_x.max_abs() > 0.0);
}

#[test]
fn test_gradient_matches_closed_form() {
    // f(x) = mean(AᵀA x), so ∇f = AᵀA 1 / N.
    let size = 16;
    let (radon, angles) = setup(size, 7);
    let graph = Graph::new();
    let x = graph.variable(random_images(radon.geometry(), &[2], 1).unwrap());

    let y = graph.radon_forward(x.id, &radon, &angles);
    let z = graph.radon_backprojection(y, &radon, &angles);
    let loss = graph.apply_op(Box::new(Mean), &[z]);
    let grads = grad(&graph, loss, &[x.id]).unwrap();

    let n = (2 * size * size) as f64;
    let seed = Stack::zeros(&[2, size, size]).unwrap().full_like(1.0 / n);
    let expected = radon
        .backprojection(&radon.forward(&seed, &angles).unwrap(), &angles)
        .unwrap();

    assert_eq!(grads[&x.id].shape(), expected.shape());
    for (a, e) in grads[&x.id].to_vec().iter().zip(expected.to_vec()) {
        assert_relative_eq!(*a, e, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn test_gradient_matches_finite_differences() {
    let (radon, angles) = setup(8, 5);
    let graph = Graph::new();
    let x = graph.variable(random_images(radon.geometry(), &[], 3).unwrap());

    let y = graph.radon_forward(x.id, &radon, &angles);
    let z = graph.radon_backprojection(y, &radon, &angles);
    let loss = graph.apply_op(Box::new(Mean), &[z]);

    let error = check_gradients(&graph, loss, x.id, 1e-3).unwrap();
    assert!(error < 1e-8, "gradient error {error}");
}

#[test]
fn test_least_squares_gradient() {
    // L(x) = mean((A x - b)²), ∇L = 2 Aᵀ(A x - b) / M.
    let size = 8;
    let (radon, angles) = setup(size, 6);
    let graph = Graph::new();
    let x = graph.variable(random_images(radon.geometry(), &[], 5).unwrap());
    let b = graph.constant(random_sinograms(radon.geometry(), &[], &angles, 6).unwrap());

    let ax = graph.radon_forward(x.id, &radon, &angles);
    let residual = graph.apply_op(Box::new(Sub), &[ax, b]);
    let sq = graph.apply_op(Box::new(Square), &[residual]);
    let loss = graph.apply_op(Box::new(Mean), &[sq]);

    let error = check_gradients(&graph, loss, x.id, 1e-3).unwrap();
    assert!(error < 1e-7, "gradient error {error}");

    let grads = backward(&graph, loss, None).unwrap();
    assert!(!grads.contains_key(&b));

    let r = graph.get_value(residual).unwrap();
    let m = r.num_elements() as f64;
    let expected = radon
        .backprojection(&r.map(|v| 2.0 * v / m), &angles)
        .unwrap();
    for (a, e) in grads[&x.id].to_vec().iter().zip(expected.to_vec()) {
        assert_relative_eq!(*a, e, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn test_backprojection_gradient_is_forward_projection() {
    let size = 12;
    let (radon, angles) = setup(size, 4);
    let graph = Graph::new();
    let y = graph.variable(random_sinograms(radon.geometry(), &[1, 2], &angles, 7).unwrap());
    let w_value = random_images(radon.geometry(), &[1, 2], 8).unwrap();
    let w = graph.constant(w_value.clone());

    let img = graph.radon_backprojection(y.id, &radon, &angles);
    let weighted = graph.apply_op(Box::new(Multiply), &[img, w]);
    let loss = graph.apply_op(Box::new(Sum), &[weighted]);

    let grads = grad(&graph, loss, &[y.id]).unwrap();
    let expected = radon.forward(&w_value, &angles).unwrap();
    assert_eq!(grads[&y.id].shape(), vec![1, 2, 4, size]);
    for (a, e) in grads[&y.id].to_vec().iter().zip(expected.to_vec()) {
        assert_relative_eq!(*a, e, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn test_angles_are_not_graph_inputs() {
    let (radon, angles) = setup(8, 3);
    let graph = Graph::new();
    let x = graph.variable(Stack::zeros(&[8, 8]).unwrap());
    let y = graph.radon_forward(x.id, &radon, &angles);

    let node = graph.get_node(y).unwrap();
    assert_eq!(node.borrow().inputs, vec![x.id]);
    assert_eq!(node.borrow().op.as_ref().unwrap().name(), "RadonForward");

    let loss = graph.apply_op(Box::new(Sum), &[y]);
    let grads = backward(&graph, loss, None).unwrap();
    // The loss, the projection and the image: nothing for the angles.
    assert_eq!(grads.len(), 3);
}

#[test]
fn test_differentiable_function() {
    let (radon, angles) = setup(8, 4);
    let mut f = DifferentiableFunction::new(Graph::new());
    let x = f.add_named_input(Stack::zeros(&[8, 8]).unwrap(), "image");

    let y = f.graph.radon_forward(x, &radon, &angles);
    let sq = f.graph.apply_op(Box::new(Square), &[y]);
    let loss = f.graph.apply_op(Box::new(Sum), &[sq]);
    f.set_output(loss);

    // At zero the loss and its gradient vanish.
    let (value, grads) = f.value_and_grad(&HashMap::new()).unwrap();
    assert_eq!(value, 0.0);
    assert_eq!(grads[&x].max_abs(), 0.0);

    // ‖A x‖² has gradient 2 AᵀA x.
    let x_value = random_images(radon.geometry(), &[], 11).unwrap();
    let mut values = HashMap::new();
    values.insert(x, x_value.clone());
    let (value, grads) = f.value_and_grad(&values).unwrap();

    let ax = radon.forward(&x_value, &angles).unwrap();
    assert_relative_eq!(value, ax.dot(&ax).unwrap(), max_relative = 1e-12);
    let expected = radon.backprojection(&ax.map(|v| 2.0 * v), &angles).unwrap();
    for (a, e) in grads[&x].to_vec().iter().zip(expected.to_vec()) {
        assert_relative_eq!(*a, e, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn test_shape_errors_surface_from_forward() {
    let (radon, angles) = setup(8, 3);
    let graph = Graph::new();
    let x = graph.variable(Stack::zeros(&[2, 8, 7]).unwrap());
    let y = graph.radon_forward(x.id, &radon, &angles);

    let err = graph.forward(y).unwrap_err();
    match err {
        AutodiffError::Radon(inner) => assert!(inner.is_shape_error()),
        other => panic!("unexpected error: {other}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_linear_loss_gradient_is_backprojection(
        size in 2usize..12,
        num_angles in 1usize..6,
        seed in any::<u64>(),
    ) {
        let radon = Arc::new(Radon::new(size, ExecutionContext::sequential()).unwrap());
        let angles = AngleSet::half_turn(num_angles).unwrap();
        let graph = Graph::new();
        let x = graph.variable(random_images(radon.geometry(), &[], seed).unwrap());
        let w_value = random_sinograms(radon.geometry(), &[], &angles, seed.wrapping_add(1)).unwrap();
        let w = graph.constant(w_value.clone());

        let y = graph.radon_forward(x.id, &radon, &angles);
        let weighted = graph.apply_op(Box::new(Multiply), &[y, w]);
        let loss = graph.apply_op(Box::new(Sum), &[weighted]);

        let grads = grad(&graph, loss, &[x.id]).unwrap();
        let expected = radon.backprojection(&w_value, &angles).unwrap();
        prop_assert_eq!(grads[&x.id].shape(), expected.shape());
        for (a, e) in grads[&x.id].to_vec().iter().zip(expected.to_vec()) {
            prop_assert!((a - e).abs() <= 1e-12 * (1.0 + e.abs()));
        }
    }
}
