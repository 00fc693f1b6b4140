// scale.rs — DPI scaling as an explicit capability. Each type lists the
// fields that grow with the scale factor; colours and line styles never do.

use crate::draw::{Pen, ShapeStyle};
use crate::geometry::Rect;

pub trait Scalable {
    fn scale(&mut self, factor: f32);
}

impl Scalable for f32 {
    fn scale(&mut self, factor: f32) {
        *self *= factor;
    }
}

impl Scalable for Rect {
    fn scale(&mut self, factor: f32) {
        self.x *= factor;
        self.y *= factor;
        self.w *= factor;
        self.h *= factor;
    }
}

impl Scalable for Pen {
    fn scale(&mut self, factor: f32) {
        self.width *= factor;
    }
}

impl Scalable for ShapeStyle {
    fn scale(&mut self, factor: f32) {
        if let Some(border) = &mut self.border {
            border.scale(factor);
        }
        self.radius *= factor;
    }
}

impl<T: Scalable> Scalable for Option<T> {
    fn scale(&mut self, factor: f32) {
        if let Some(v) = self {
            v.scale(factor);
        }
    }
}

/// Scale every item of a widget's scalable fields in one go.
pub fn scale_all(items: &mut [&mut dyn Scalable], factor: f32) {
    for item in items.iter_mut() {
        item.scale(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::Brush;
    use crate::geometry::Color;

    #[test]
    fn style_scales_border_and_radius_only() {
        let mut style = ShapeStyle {
            fill: Some(Brush::Solid(Color::RED)),
            border: Some(Pen::new(Color::BLUE).with_width(1.5)),
            radius: 4.0,
        };
        style.scale(2.0);
        assert_eq!(style.radius, 8.0);
        assert_eq!(style.border.map(|p| p.width), Some(3.0));
        assert_eq!(style.border.map(|p| p.color), Some(Color::BLUE));
        assert_eq!(style.fill, Some(Brush::Solid(Color::RED)));
    }

    #[test]
    fn scale_all_visits_each_field() {
        let mut bounds = Rect::new(1., 2., 10., 20.);
        let mut padding = 3.0f32;
        let mut pen: Option<Pen> = None;
        scale_all(&mut [&mut bounds, &mut padding, &mut pen], 1.5);
        assert_eq!(bounds, Rect::new(1.5, 3., 15., 30.));
        assert_eq!(padding, 4.5);
        assert_eq!(pen, None);
    }
}
