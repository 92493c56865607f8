use image::{DynamicImage, ImageFormat, ImageResult};

/// Decodes a complete byte stream into an image.
pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> ImageResult<(DynamicImage, ImageFormat)>;
}

impl<C: ImageCodec + ?Sized> ImageCodec for Box<C> {
    fn decode(&self, bytes: &[u8]) -> ImageResult<(DynamicImage, ImageFormat)> {
        (**self).decode(bytes)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> ImageResult<(DynamicImage, ImageFormat)> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
        Ok((image, ImageFormat::Jpeg))
    }
}
