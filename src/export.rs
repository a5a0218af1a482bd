// SPDX-License-Identifier: MPL-2.0
//! Frame export and print-document rendering.
//!
//! This module turns an engine-captured RGBA frame into a raster blob
//! (PNG or JPEG) bound to a filename, and renders the print page: an
//! HTML document embedding the current frame with the study metadata
//! table. Capturing the frame itself is the engine's job.

use crate::engine::CapturedFrame;
use crate::error::{Error, Result};
use crate::study::ImageMetadata;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use image_rs::{ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy, smaller file size).
    Jpeg,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }

    /// Returns the image format for the `image` crate.
    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// Parses a format name such as `"png"`, `"jpg"` or `"jpeg"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<ExportFormat> {
        match name.to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    /// Parses a format name, falling back to PNG for unsupported names.
    #[must_use]
    pub fn from_name_or_png(name: &str) -> ExportFormat {
        ExportFormat::from_name(name).unwrap_or_else(|| {
            tracing::warn!(format = name, "unsupported export format, defaulting to PNG");
            ExportFormat::Png
        })
    }
}

/// An encoded frame ready to hand to the embedding UI for download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// Encodes a captured frame into the requested raster format.
///
/// JPEG output drops the alpha channel (the format has none).
///
/// # Errors
///
/// Returns [`Error::Export`] if the pixel buffer is inconsistent with the
/// frame dimensions or the encoder fails.
pub fn encode_frame(frame: &CapturedFrame, format: ExportFormat) -> Result<Vec<u8>> {
    let img: ImageBuffer<Rgba<u8>, _> =
        ImageBuffer::from_raw(frame.width, frame.height, (*frame.rgba_data).clone()).ok_or_else(
            || Error::Export("captured frame data does not match its dimensions".to_string()),
        )?;

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    match format {
        ExportFormat::Jpeg => {
            let rgb = image_rs::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.write_to(&mut cursor, format.image_format())
                .map_err(|e| Error::Export(format!("failed to encode frame: {e}")))?;
        }
        ExportFormat::Png => {
            img.write_to(&mut cursor, format.image_format())
                .map_err(|e| Error::Export(format!("failed to encode frame: {e}")))?;
        }
    }
    Ok(bytes)
}

/// Generates the download filename for an export.
///
/// Format: `{patient}-{epoch_millis}.{ext}`, with the patient name
/// reduced to filesystem-safe characters.
#[must_use]
pub fn export_filename(
    patient_name: &str,
    timestamp: DateTime<Utc>,
    format: ExportFormat,
) -> String {
    let safe_name: String = patient_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let safe_name = if safe_name.is_empty() {
        "dicom-image".to_string()
    } else {
        safe_name
    };
    format!(
        "{}-{}.{}",
        safe_name,
        timestamp.timestamp_millis(),
        format.extension()
    )
}

/// Renders the print page: the current frame embedded as a data URI plus
/// the study metadata table and the print date.
///
/// # Errors
///
/// Returns [`Error::Export`] if the frame cannot be PNG-encoded.
pub fn print_document(
    metadata: &ImageMetadata,
    frame: &CapturedFrame,
    printed_at: DateTime<Utc>,
) -> Result<String> {
    let png = encode_frame(frame, ExportFormat::Png)?;
    let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(png));

    let optional = |value: Option<i32>| {
        value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>DICOM Print - {patient}</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; }}
    .header {{ border-bottom: 1px solid #ccc; padding-bottom: 10px; margin-bottom: 20px; }}
    .image-container {{ text-align: center; margin: 20px 0; }}
    img {{ max-width: 100%; height: auto; border: 1px solid #ddd; }}
    .metadata {{ font-size: 12px; margin-top: 20px; border-top: 1px solid #ccc; padding-top: 10px; }}
    table {{ width: 100%; border-collapse: collapse; }}
    td {{ padding: 4px; border-bottom: 1px solid #eee; }}
    td:first-child {{ font-weight: bold; width: 150px; }}
    @media print {{
      @page {{ size: auto; margin: 10mm; }}
      body {{ padding: 0; }}
      button {{ display: none; }}
    }}
  </style>
</head>
<body>
  <div class="header">
    <h1>DICOM Image</h1>
    <button onclick="window.print();">Print</button>
    <button onclick="window.close();">Close</button>
  </div>
  <div class="image-container">
    <img src="{data_uri}" alt="DICOM Image" />
  </div>
  <div class="metadata">
    <h3>Image Information</h3>
    <table>
      <tr><td>Patient Name:</td><td>{patient}</td></tr>
      <tr><td>Patient ID:</td><td>{patient_id}</td></tr>
      <tr><td>Study Date:</td><td>{study_date}</td></tr>
      <tr><td>Modality:</td><td>{modality}</td></tr>
      <tr><td>Series Number:</td><td>{series}</td></tr>
      <tr><td>Instance Number:</td><td>{instance}</td></tr>
      <tr><td>Print Date:</td><td>{print_date}</td></tr>
    </table>
  </div>
</body>
</html>
"#,
        patient = metadata.patient_name,
        patient_id = metadata.patient_id,
        study_date = metadata.study_date,
        modality = metadata.modality,
        series = optional(metadata.series_number),
        instance = optional(metadata.instance_number),
        print_date = printed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn white_frame(width: u32, height: u32) -> CapturedFrame {
        CapturedFrame::new(
            Arc::new(vec![255u8; (4 * width * height) as usize]),
            width,
            height,
        )
    }

    fn sample_metadata() -> ImageMetadata {
        ImageMetadata {
            patient_name: "DOE^JANE".to_string(),
            patient_id: "P-1234".to_string(),
            study_date: "2024-03-18".to_string(),
            modality: "CT".to_string(),
            series_number: Some(2),
            instance_number: None,
        }
    }

    #[test]
    fn format_extensions_and_mime_types() {
        assert_eq!(ExportFormat::Png.extension(), "png");
        assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
        assert_eq!(ExportFormat::Png.mime_type(), "image/png");
        assert_eq!(ExportFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn from_name_accepts_known_aliases() {
        assert_eq!(ExportFormat::from_name("png"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_name("PNG"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_name("jpg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_name("jpeg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_name("webp"), None);
    }

    #[test]
    fn from_name_or_png_falls_back_for_unknown_formats() {
        assert_eq!(ExportFormat::from_name_or_png("tiff"), ExportFormat::Png);
        assert_eq!(ExportFormat::from_name_or_png("jpeg"), ExportFormat::Jpeg);
    }

    #[test]
    fn encode_frame_produces_png_bytes() {
        let bytes = encode_frame(&white_frame(4, 4), ExportFormat::Png).expect("encode");
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn encode_frame_produces_jpeg_bytes() {
        let bytes = encode_frame(&white_frame(4, 4), ExportFormat::Jpeg).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_frame_rejects_mismatched_dimensions() {
        let frame = CapturedFrame::new(Arc::new(vec![0u8; 7]), 4, 4);
        assert!(matches!(
            encode_frame(&frame, ExportFormat::Png),
            Err(Error::Export(_))
        ));
    }

    #[test]
    fn export_filename_stamps_and_sanitizes() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 18, 12, 0, 0).unwrap();
        let name = export_filename("DOE^JANE", timestamp, ExportFormat::Png);
        assert_eq!(
            name,
            format!("DOE_JANE-{}.png", timestamp.timestamp_millis())
        );
    }

    #[test]
    fn export_filename_handles_empty_patient_name() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 18, 12, 0, 0).unwrap();
        let name = export_filename("", timestamp, ExportFormat::Jpeg);
        assert!(name.starts_with("dicom-image-"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn print_document_embeds_frame_and_metadata() {
        let printed_at = Utc.with_ymd_and_hms(2024, 3, 18, 14, 30, 0).unwrap();
        let html = print_document(&sample_metadata(), &white_frame(2, 2), printed_at)
            .expect("print document");

        assert!(html.contains("DICOM Print - DOE^JANE"));
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("<tr><td>Patient ID:</td><td>P-1234</td></tr>"));
        assert!(html.contains("<tr><td>Series Number:</td><td>2</td></tr>"));
        // Missing instance number renders as N/A rather than empty.
        assert!(html.contains("<tr><td>Instance Number:</td><td>N/A</td></tr>"));
        assert!(html.contains("2024-03-18 14:30:00 UTC"));
    }
}
