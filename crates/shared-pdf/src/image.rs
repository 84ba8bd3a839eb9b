//! PNG signature images as PDF image XObjects

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{write::ZlibEncoder, Compression};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::PdfExportError;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// 8-bit samples split into colour and alpha planes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub data: Vec<u8>,
    /// Present when the source had an alpha channel; becomes an SMask
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Decode a `data:image/png;base64,...` URL.
pub fn decode_data_url(url: &str) -> Result<DecodedImage, PdfExportError> {
    let payload = url
        .trim()
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| PdfExportError::Image("expected a PNG data URL".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| PdfExportError::Image(format!("invalid base64: {}", e)))?;
    decode_png(&bytes)
}

pub fn decode_png(bytes: &[u8]) -> Result<DecodedImage, PdfExportError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfExportError::Image(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| PdfExportError::Image(e.to_string()))?;
    let samples = &buf[..info.buffer_size()];

    let (color_space, data, alpha) = match info.color_type {
        png::ColorType::Grayscale => ("DeviceGray", samples.to_vec(), None),
        png::ColorType::Rgb => ("DeviceRGB", samples.to_vec(), None),
        png::ColorType::GrayscaleAlpha => {
            let (gray, alpha) = split_alpha(samples, 2);
            ("DeviceGray", gray, Some(alpha))
        }
        png::ColorType::Rgba => {
            let (rgb, alpha) = split_alpha(samples, 4);
            ("DeviceRGB", rgb, Some(alpha))
        }
        png::ColorType::Indexed => {
            return Err(PdfExportError::Image(
                "indexed PNG was not expanded".to_string(),
            ))
        }
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        color_space,
        data,
        alpha,
    })
}

fn split_alpha(samples: &[u8], channels: usize) -> (Vec<u8>, Vec<u8>) {
    let pixels = samples.len() / channels;
    let mut color = Vec::with_capacity(pixels * (channels - 1));
    let mut alpha = Vec::with_capacity(pixels);
    for px in samples.chunks_exact(channels) {
        color.extend_from_slice(&px[..channels - 1]);
        alpha.push(px[channels - 1]);
    }
    (color, alpha)
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, PdfExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| PdfExportError::Image(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfExportError::Image(e.to_string()))
}

/// Add the image (and its soft mask) to `doc`, returning the image object id.
pub fn add_image_xobject(
    doc: &mut Document,
    image: &DecodedImage,
) -> Result<ObjectId, PdfExportError> {
    let width = Object::Integer(image.width as i64);
    let height = Object::Integer(image.height as i64);

    let mask_id = match &image.alpha {
        Some(alpha) => {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "ColorSpace" => "DeviceGray",
                "Width" => width.clone(),
                "Height" => height.clone(),
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            let stream = Stream::new(mask_dict, deflate(alpha)?).with_compression(false);
            Some(doc.add_object(stream))
        }
        None => None,
    };

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "ColorSpace" => image.color_space,
        "Width" => width,
        "Height" => height,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(mask_id) = mask_id {
        image_dict.set("SMask", Object::Reference(mask_id));
    }
    let stream = Stream::new(image_dict, deflate(&image.data)?).with_compression(false);
    Ok(doc.add_object(stream))
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(rgba).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn rgba_is_split_into_color_and_mask() {
        let rgba = [255, 0, 0, 255, 0, 0, 255, 0];
        let png = encode_test_png(2, 1, &rgba);
        let img = decode_png(&png).unwrap();
        assert_eq!(img.color_space, "DeviceRGB");
        assert_eq!(img.data, vec![255, 0, 0, 0, 0, 255]);
        assert_eq!(img.alpha, Some(vec![255, 0]));
        assert_eq!((img.width, img.height), (2, 1));
    }

    #[test]
    fn data_url_roundtrip() {
        let png = encode_test_png(1, 1, &[0, 0, 0, 255]);
        let url = format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&png));
        let img = decode_data_url(&url).unwrap();
        assert_eq!(img.width, 1);
    }

    #[test]
    fn non_png_urls_rejected() {
        assert!(decode_data_url("data:image/jpeg;base64,AAAA").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
        assert!(decode_png(b"not a png").is_err());
    }

    #[test]
    fn xobject_carries_smask() {
        let png = encode_test_png(1, 1, &[10, 20, 30, 128]);
        let img = decode_png(&png).unwrap();
        let mut doc = Document::with_version("1.7");
        let id = add_image_xobject(&mut doc, &img).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
        let mut rgb = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut rgb)
            .unwrap();
        assert_eq!(rgb, vec![10, 20, 30]);

        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        let mut alpha = Vec::new();
        ZlibDecoder::new(mask.content.as_slice())
            .read_to_end(&mut alpha)
            .unwrap();
        assert_eq!(alpha, vec![128]);
    }
}
