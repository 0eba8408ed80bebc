use crate::core::detector::FaceBox;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const HIGH_CONFIDENCE: Rgb<u8> = Rgb([0, 255, 0]);
const MEDIUM_CONFIDENCE: Rgb<u8> = Rgb([255, 255, 0]);
const LOW_CONFIDENCE: Rgb<u8> = Rgb([255, 0, 0]);

fn color_for(confidence: f32) -> Rgb<u8> {
    if confidence > 0.7 {
        HIGH_CONFIDENCE
    } else if confidence > 0.5 {
        MEDIUM_CONFIDENCE
    } else {
        LOW_CONFIDENCE
    }
}

/// Copy of `image` with a box drawn around every face, colored by confidence.
pub fn annotate_faces(image: &DynamicImage, faces: &[FaceBox]) -> RgbImage {
    let mut img = image.to_rgb8();

    for face in faces {
        if face.width() <= 0.0 || face.height() <= 0.0 {
            continue;
        }

        let x1 = face.x1.max(0.0) as i32;
        let y1 = face.y1.max(0.0) as i32;
        let x2 = face.x2.min(img.width() as f32) as i32;
        let y2 = face.y2.min(img.height() as f32) as i32;
        let rect_width = (x2 - x1).max(1) as u32;
        let rect_height = (y2 - y1).max(1) as u32;

        let color = color_for(face.confidence);
        draw_hollow_rect_mut(&mut img, Rect::at(x1, y1).of_size(rect_width, rect_height), color);

        // Second pass thickens the border of confident detections.
        if face.confidence > 0.5 && rect_width > 2 && rect_height > 2 {
            let inner = Rect::at(x1 + 1, y1 + 1).of_size(rect_width - 2, rect_height - 2);
            draw_hollow_rect_mut(&mut img, inner, color);
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_is_drawn_and_interior_untouched() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let face = FaceBox { x1: 2.0, y1: 2.0, x2: 12.0, y2: 12.0, confidence: 0.9 };
        let out = annotate_faces(&image, &[face]);

        assert_eq!(*out.get_pixel(2, 2), HIGH_CONFIDENCE);
        assert_eq!(*out.get_pixel(3, 3), HIGH_CONFIDENCE);
        assert_eq!(*out.get_pixel(7, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let face = FaceBox { x1: 4.0, y1: 4.0, x2: 4.0, y2: 6.0, confidence: 0.9 };
        let out = annotate_faces(&image, &[face]);
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn colors_follow_confidence() {
        assert_eq!(color_for(0.95), HIGH_CONFIDENCE);
        assert_eq!(color_for(0.6), MEDIUM_CONFIDENCE);
        assert_eq!(color_for(0.2), LOW_CONFIDENCE);
    }
}
