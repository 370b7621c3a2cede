use crate::*;
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub xmin: float,
    pub ymin: float,
    pub xmax: float,
    pub ymax: float,
}
impl Rect {
    pub fn from_bbox(bbox: [[float; 2]; 2]) -> Self {
        Self {
            xmin: bbox[0][0],
            ymin: bbox[0][1],
            xmax: bbox[1][0],
            ymax: bbox[1][1],
        }
    }
    pub fn from_size(xmin: float, ymin: float, width: float, height: float) -> Self {
        Self {
            xmin,
            ymin,
            xmax: xmin + width,
            ymax: ymin + height,
        }
    }
    pub fn width(&self) -> float {
        self.xmax - self.xmin
    }
    pub fn height(&self) -> float {
        self.ymax - self.ymin
    }
    pub fn area(&self) -> float {
        self.width().max(0.0) * self.height().max(0.0)
    }
    /// Overlapping rectangle, `None` when the two only touch or are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        let xmax = self.xmax.min(other.xmax);
        let ymax = self.ymax.min(other.ymax);
        (xmax > xmin && ymax > ymin).then_some(Rect {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }
    pub fn intersection_area(&self, other: &Rect) -> float {
        let dx = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let dy = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if dx <= 0.0 || dy <= 0.0 {
            0.0
        } else {
            dx * dy
        }
    }
}
