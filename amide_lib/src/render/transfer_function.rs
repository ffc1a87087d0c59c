use crate::error::{EngineError, Result};

/// Entries of a ramp lookup table, one per 8-bit density or gradient value
pub const RAMP_SIZE: usize = 256;

/// How control points of a [`Ramp`] are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveType {
    #[default]
    Linear,
    /// Catmull-Rom through the control points, clamped to `[0, 1]`
    Spline,
    /// Explicit table, no control points
    Free,
}

/// Opacity transfer function over 8-bit values.
///
/// Control points are `(value, opacity)` pairs, value in `0..=255` ascending,
/// opacity in `[0, 1]`. Values before the first point take its opacity,
/// values after the last one take the last opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    curve: CurveType,
    points: Vec<(f32, f32)>,
    // only for CurveType::Free
    free: Vec<f32>,
}

impl Default for Ramp {
    /// Opacity 0 at value 0 up to opacity 1 at 255
    fn default() -> Self {
        Ramp {
            curve: CurveType::Linear,
            points: vec![(0.0, 0.0), (255.0, 1.0)],
            free: Vec::new(),
        }
    }
}

impl Ramp {
    pub fn linear(points: Vec<(f32, f32)>) -> Result<Ramp> {
        check_points(&points)?;
        Ok(Ramp {
            curve: CurveType::Linear,
            points,
            free: Vec::new(),
        })
    }

    pub fn spline(points: Vec<(f32, f32)>) -> Result<Ramp> {
        check_points(&points)?;
        Ok(Ramp {
            curve: CurveType::Spline,
            points,
            free: Vec::new(),
        })
    }

    /// Ramp given directly by its table of [`RAMP_SIZE`] opacities
    pub fn free(table: Vec<f32>) -> Result<Ramp> {
        if table.len() != RAMP_SIZE {
            return Err(EngineError::InvalidArgument(format!(
                "Free ramp needs {RAMP_SIZE} entries, got {}",
                table.len()
            )));
        }
        if !table.iter().all(|v| (0.0..=1.0).contains(v)) {
            return Err(EngineError::InvalidArgument(
                "Ramp opacities must be in [0, 1]".into(),
            ));
        }
        Ok(Ramp {
            curve: CurveType::Free,
            points: Vec::new(),
            free: table,
        })
    }

    pub fn curve_type(&self) -> CurveType {
        self.curve
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Lookup table, entry `i` is the opacity of value `i`
    pub fn table(&self) -> [f32; RAMP_SIZE] {
        let mut table = [0.0; RAMP_SIZE];
        match self.curve {
            CurveType::Free => table.copy_from_slice(&self.free),
            CurveType::Linear => table
                .iter_mut()
                .enumerate()
                .for_each(|(i, v)| *v = self.linear_at(i as f32)),
            CurveType::Spline => table
                .iter_mut()
                .enumerate()
                .for_each(|(i, v)| *v = self.spline_at(i as f32).clamp(0.0, 1.0)),
        }
        table
    }

    // index of the segment holding x, None outside of the points
    fn segment(&self, x: f32) -> Option<usize> {
        self.points.windows(2).position(|w| x >= w[0].0 && x <= w[1].0)
    }

    fn outside(&self, x: f32) -> f32 {
        match (self.points.first(), self.points.last()) {
            (Some(first), _) if x <= first.0 => first.1,
            (_, Some(last)) => last.1,
            _ => 0.0,
        }
    }

    fn linear_at(&self, x: f32) -> f32 {
        match self.segment(x) {
            Some(s) => {
                let (x0, y0) = self.points[s];
                let (x1, y1) = self.points[s + 1];
                let t = (x - x0) / (x1 - x0);
                y0 + t * (y1 - y0)
            }
            None => self.outside(x),
        }
    }

    fn spline_at(&self, x: f32) -> f32 {
        let s = match self.segment(x) {
            Some(s) => s,
            None => return self.outside(x),
        };
        let n = self.points.len();
        let p = |i: isize| self.points[i.clamp(0, n as isize - 1) as usize];

        let (x0, y0) = p(s as isize);
        let (x1, y1) = p(s as isize + 1);
        let (xp, yp) = p(s as isize - 1);
        let (xn, yn) = p(s as isize + 2);

        // tangents as finite differences, per unit of x
        let m0 = if xp < x0 { (y1 - yp) / (x1 - xp) } else { (y1 - y0) / (x1 - x0) };
        let m1 = if xn > x1 { (yn - y0) / (xn - x0) } else { (y1 - y0) / (x1 - x0) };

        let h = x1 - x0;
        let t = (x - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        (2.0 * t3 - 3.0 * t2 + 1.0) * y0
            + (t3 - 2.0 * t2 + t) * h * m0
            + (-2.0 * t3 + 3.0 * t2) * y1
            + (t3 - t2) * h * m1
    }
}

fn check_points(points: &[(f32, f32)]) -> Result<()> {
    if points.is_empty() {
        return Err(EngineError::InvalidArgument(
            "Ramp needs at least one control point".into(),
        ));
    }
    let in_range = points
        .iter()
        .all(|&(x, y)| (0.0..=255.0).contains(&x) && (0.0..=1.0).contains(&y));
    if !in_range {
        return Err(EngineError::InvalidArgument(format!(
            "Control points {points:?} outside of [0, 255] × [0, 1]"
        )));
    }
    if !points.windows(2).all(|w| w[0].0 < w[1].0) {
        return Err(EngineError::InvalidArgument(
            "Control points must be strictly ascending".into(),
        ));
    }
    Ok(())
}
