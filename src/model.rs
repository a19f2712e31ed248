//! Process model callables
//!
//! The transition and control models map an elapsed time `dt` to the matrix
//! used by one predict step. They are supplied once at construction and only
//! ever invoked by the filter.

use nalgebra::SMatrix;

/// Transition model: `dt -> A` (N x N)
pub type TransitionFn<const N: usize> = Box<dyn Fn(f64) -> SMatrix<f64, N, N> + Send + Sync>;

/// Control model: `dt -> B` (N x M)
pub type ControlFn<const N: usize, const M: usize> =
    Box<dyn Fn(f64) -> SMatrix<f64, N, M> + Send + Sync>;

/// Transition model that ignores `dt`
pub fn constant_transition<const N: usize>(a: SMatrix<f64, N, N>) -> TransitionFn<N> {
    Box::new(move |_: f64| a)
}

/// Control model that ignores `dt`
pub fn constant_control<const N: usize, const M: usize>(b: SMatrix<f64, N, M>) -> ControlFn<N, M> {
    Box::new(move |_: f64| b)
}

/// Control model for systems without inputs
pub fn zero_control<const N: usize, const M: usize>() -> ControlFn<N, M> {
    constant_control(SMatrix::zeros())
}

#[cfg(test)]
mod tests {
    use nalgebra::{Matrix2, Matrix2x1};

    use super::*;

    #[test]
    fn test_constant_models_ignore_dt() {
        let a = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        let transition = constant_transition(a);
        assert_eq!(transition(0.0), a);
        assert_eq!(transition(-5.0), a);

        let control = zero_control::<2, 1>();
        assert_eq!(control(1.0), Matrix2x1::zeros());
    }
}
