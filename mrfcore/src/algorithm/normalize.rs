use nalgebra::DMatrix;

/// Added to every norm so all-zero trajectories (background pixels) stay finite.
pub const NORM_EPSILON: f64 = 1e-10;

/// Scales every column (one trajectory per column) to unit L2 norm.
///
/// Each column is divided by `norm + NORM_EPSILON`, so an all-zero column stays zero.
/// After this, the dot product of two columns is their cosine similarity, which makes
/// matching insensitive to receiver gain and proton density.
pub fn normalize_columns(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = matrix.clone();
    normalize_columns_mut(&mut out);
    out
}

pub fn normalize_columns_mut(matrix: &mut DMatrix<f64>) {
    for mut column in matrix.column_iter_mut() {
        let norm = column.norm();
        column.unscale_mut(norm + NORM_EPSILON);
    }
}

/// Normalizes a single trajectory.
pub fn normalize_trajectory(trajectory: &[f64]) -> Vec<f64> {
    let norm = trajectory.iter().map(|x| x * x).sum::<f64>().sqrt();
    trajectory.iter().map(|x| x / (norm + NORM_EPSILON)).collect()
}

/// Cosine similarity of two trajectories, using the same epsilon as `normalize_columns`.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let a = normalize_trajectory(a);
    let b = normalize_trajectory(b);
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
