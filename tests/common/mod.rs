use std::fs;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage};

/// Write a real encoded image so decoders and size probes see valid bytes.
pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    };
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .save_with_format(path, format)
        .expect("write image file");
}

pub fn write_text(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write text file");
}

/// A minimal VOC annotation with one object per (name, corners) pair.
pub fn voc_xml(size: Option<(u32, u32)>, objects: &[(&str, [i32; 4])]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<annotation>\n");
    if let Some((width, height)) = size {
        xml.push_str(&format!(
            "  <size><width>{width}</width><height>{height}</height><depth>3</depth></size>\n"
        ));
    }
    for (name, [xmin, ymin, xmax, ymax]) in objects {
        xml.push_str(&format!(
            "  <object>\n    <name>{name}</name>\n    <bndbox>\
             <xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax>\
             </bndbox>\n  </object>\n"
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}
