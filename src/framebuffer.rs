use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::layout::{SCREEN_H, SCREEN_W};

/// Landscape framebuffer dimensions.
pub const FB_WIDTH: u32 = SCREEN_W as u32;
pub const FB_HEIGHT: u32 = SCREEN_H as u32;

/// Heap-backed canvas. The whole panel is composed here and pushed to the
/// display in one contiguous transfer.
pub struct Framebuffer {
    pixels: Vec<Rgb565>,
    size: Size,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; (width * height) as usize],
            size: Size::new(width, height),
        }
    }

    fn index(&self, p: Point) -> Option<usize> {
        let in_x = (0..self.size.width as i32).contains(&p.x);
        let in_y = (0..self.size.height as i32).contains(&p.y);
        (in_x && in_y).then(|| p.y as usize * self.size.width as usize + p.x as usize)
    }

    pub fn clear_color(&mut self, color: Rgb565) {
        self.pixels.fill(color);
    }

    /// Colour at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb565> {
        self.index(Point::new(x, y)).map(|i| self.pixels[i])
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Row-major colours, ready for `DrawTarget::fill_contiguous`.
    pub fn colors(&self) -> impl Iterator<Item = Rgb565> + '_ {
        self.pixels.iter().copied()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if let Some(i) = self.index(p) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        let Some(bottom_right) = clipped.bottom_right() else {
            return Ok(());
        };
        let stride = self.size.width as usize;
        let (x0, x1) = (clipped.top_left.x as usize, bottom_right.x as usize);
        for y in clipped.rows() {
            let row = y as usize * stride;
            self.pixels[row + x0..=row + x1].fill(color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn clear_and_read_back() {
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
        fb.clear_color(Rgb565::BLUE);
        assert_eq!(fb.pixel(0, 0), Some(Rgb565::BLUE));
        assert_eq!(fb.pixel(319, 239), Some(Rgb565::BLUE));
        assert_eq!(fb.pixel(320, 0), None);
        assert_eq!(fb.pixel(-1, 5), None);
        assert_eq!(fb.len(), 320 * 240);
    }

    #[test]
    fn fill_solid_clips_to_bounds() {
        let mut fb = Framebuffer::new(10, 10);
        Rectangle::new(Point::new(8, 8), Size::new(5, 5))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
            .draw(&mut fb)
            .ok();
        assert_eq!(fb.pixel(9, 9), Some(Rgb565::RED));
        assert_eq!(fb.pixel(7, 7), Some(Rgb565::BLACK));
    }

    #[test]
    fn colors_iterate_row_major() {
        let mut fb = Framebuffer::new(3, 2);
        Pixel(Point::new(2, 0), Rgb565::GREEN).draw(&mut fb).ok();
        let colors: Vec<Rgb565> = fb.colors().collect();
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[2], Rgb565::GREEN);
        assert_eq!(colors[3], Rgb565::BLACK);
    }
}
