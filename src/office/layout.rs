//! Fixed geometry of the office floor.

use rand::Rng;

/// A point on the floor, in terminal cells. Fractional while walking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned rectangle agents pick random destinations from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Area {
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            uniform(rng, self.x_min, self.x_max),
            uniform(rng, self.y_min, self.y_max),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        (self.x_min..=self.x_max).contains(&p.x) && (self.y_min..=self.y_max).contains(&p.y)
    }
}

/// One cubicle: top-left corner of the desk plus the chair an agent sits on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskSpot {
    pub x: u16,
    pub y: u16,
    pub chair: Point,
}

impl DeskSpot {
    pub fn new(x: u16, y: u16, chair_x: u16, chair_y: u16) -> Self {
        Self {
            x,
            y,
            chair: Point::new(f64::from(chair_x), f64::from(chair_y)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfficeLayout {
    pub width: u16,
    pub height: u16,
    pub desks: Vec<DeskSpot>,
    /// Where idle agents hang around.
    pub lounge: Area,
    /// Break spot agents walk to while thinking.
    pub coffee: Area,
    /// Where new agents appear.
    pub entrance: Area,
    pub walkway_y: u16,
}

/// Cubicle width in cells; desks are laid out left to right at this pitch.
pub const CUBICLE_WIDTH: u16 = 15;

impl Default for OfficeLayout {
    fn default() -> Self {
        Self {
            width: 78,
            height: 22,
            desks: vec![
                DeskSpot::new(5, 3, 12, 6),
                DeskSpot::new(21, 3, 28, 6),
                DeskSpot::new(37, 3, 44, 6),
                DeskSpot::new(53, 3, 60, 6),
            ],
            lounge: Area::new(16.0, 52.0, 11.0, 16.0),
            coffee: Area::new(5.0, 11.0, 14.0, 16.0),
            entrance: Area::new(30.0, 50.0, 17.0, 19.0),
            walkway_y: 9,
        }
    }
}

impl OfficeLayout {
    /// Same floor with only the first `n` desks.
    pub fn with_desks(mut self, n: usize) -> Self {
        self.desks.truncate(n);
        self
    }

    /// Column where the whiteboard box starts.
    pub fn whiteboard_x(&self) -> u16 {
        self.width.saturating_sub(17)
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_floor_has_four_desks_left_to_right() {
        let layout = OfficeLayout::default();
        assert_eq!(layout.desks.len(), 4);
        let xs: Vec<u16> = layout.desks.iter().map(|d| d.x).collect();
        assert_eq!(xs, vec![5, 21, 37, 53]);
        assert_eq!(layout.desks[0].chair, Point::new(12.0, 6.0));
        assert_eq!(layout.whiteboard_x(), 61);
    }

    #[test]
    fn samples_stay_inside_area() {
        let mut rng = StdRng::seed_from_u64(1);
        let lounge = OfficeLayout::default().lounge;
        for _ in 0..200 {
            assert!(lounge.contains(lounge.sample(&mut rng)));
        }
    }

    #[test]
    fn degenerate_area_samples_its_corner() {
        let mut rng = StdRng::seed_from_u64(1);
        let spot = Area::new(7.0, 7.0, 14.0, 14.0);
        assert_eq!(spot.sample(&mut rng), Point::new(7.0, 14.0));
    }

    #[test]
    fn with_desks_truncates_pool() {
        assert_eq!(OfficeLayout::default().with_desks(2).desks.len(), 2);
    }
}
