//! Test data generators for synthetic grids.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Returns
///
/// A `Vec<f64>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Value of cell (`row`, `col`) at time step `step` in
/// [`create_time_series_grid`].
pub fn step_value(step: usize, row: usize, col: usize) -> f64 {
    (step * 100_000 + col * 100 + row) as f64
}

/// Creates `steps` consecutive grids, time-major, whose values encode the
/// step, column and row (see [`step_value`]).
///
/// `first_step` is the step number of the first grid, so grids from
/// several sources can be told apart after they are appended to one
/// archive.
pub fn create_time_series_grid(
    first_step: usize,
    steps: usize,
    width: usize,
    height: usize,
) -> Vec<f64> {
    let mut data = Vec::with_capacity(steps * width * height);
    for step in first_step..first_step + steps {
        for row in 0..height {
            for col in 0..width {
                data.push(step_value(step, row, col));
            }
        }
    }
    data
}

/// Creates a test grid with temperature-like values in Kelvin.
///
/// The values range from approximately 250K to 310K, a gradient from cold
/// (top-left) to warm (bottom-right).
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f64 / width.max(1) as f64;
            let y_factor = row as f64 / height.max(1) as f64;
            data.push(250.0 + (x_factor + y_factor) * 30.0);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// `count` evenly spaced axis values starting at `start`.
pub fn axis_values(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_time_series_encodes_step() {
        let grid = create_time_series_grid(4, 2, 2, 1);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], step_value(4, 0, 0));
        assert_eq!(grid[3], step_value(5, 0, 1));
        assert_eq!(step_value(5, 0, 1), 500_100.0);
    }

    #[test]
    fn test_temperature_range() {
        let grid = create_temperature_grid(10, 10);
        assert!(grid.iter().all(|v| (250.0..=310.0).contains(v)));
        assert_eq!(grid[0], 250.0);
    }

    #[test]
    fn test_axis_values() {
        assert_eq!(axis_values(-100.0, 0.5, 3), vec![-100.0, -99.5, -99.0]);
        assert!(create_constant_grid(2, 2, 1.5).iter().all(|v| *v == 1.5));
    }
}
