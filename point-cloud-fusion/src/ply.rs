/// ASCII PLY export of the merged point cloud.
use crate::merge_store::Vertex;
use constants::export::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlyError {
    #[error("Could not convert PLY content to ASCII data.")]
    Encoding,
    #[error("failed to write PLY file: {0}")]
    Io(#[from] std::io::Error),
}

/// A serialized point cloud ready to hand to a share or save sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyExport {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Normalised colour channel to an 8-bit PLY `uchar`.
pub fn color_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn header(vertex_count: usize) -> String {
    format!(
        "ply\n\
         format ascii 1.0\n\
         element vertex {vertex_count}\n\
         property float x\n\
         property float y\n\
         property float z\n\
         property uchar red\n\
         property uchar green\n\
         property uchar blue\n\
         property uchar alpha\n\
         end_header\n"
    )
}

fn vertex_line(vertex: &Vertex) -> String {
    let p = vertex.position;
    let c = vertex.color;
    format!(
        "{:?} {:?} {:?} {} {} {} {}\n",
        p.x,
        p.y,
        p.z,
        color_byte(c.x),
        color_byte(c.y),
        color_byte(c.z),
        color_byte(c.w)
    )
}

/// Stream the header and one `x y z r g b a` line per vertex.
pub fn write_ply<W: Write>(writer: &mut W, vertices: &[Vertex]) -> Result<(), PlyError> {
    writer.write_all(header(vertices.len()).as_bytes())?;

    for vertex in vertices {
        let line = vertex_line(vertex);
        if !line.is_ascii() {
            return Err(PlyError::Encoding);
        }
        writer.write_all(line.as_bytes())?;
    }

    Ok(())
}

pub fn serialize(vertices: &[Vertex]) -> Result<Vec<u8>, PlyError> {
    let mut bytes = Vec::with_capacity(256 + vertices.len() * 48);
    write_ply(&mut bytes, vertices)?;
    Ok(bytes)
}

pub fn export(vertices: &[Vertex]) -> Result<PlyExport, PlyError> {
    Ok(PlyExport {
        file_name: EXPORT_FILE_NAME,
        content_type: EXPORT_CONTENT_TYPE,
        bytes: serialize(vertices)?,
    })
}

pub fn export_to_path(path: &Path, vertices: &[Vertex]) -> Result<(), PlyError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ply(&mut writer, vertices)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::{Vec3, Vec4};

    fn text(vertices: &[Vertex]) -> String {
        String::from_utf8(serialize(vertices).unwrap()).unwrap()
    }

    #[test]
    fn empty_cloud_has_only_a_header() {
        let output = text(&[]);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.first(), Some(&"ply"));
        assert!(lines.contains(&"element vertex 0"));
        assert_eq!(lines.last(), Some(&"end_header"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn header_declares_properties_in_order() {
        let output = text(&[]);
        let properties: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with("property"))
            .collect();
        assert_eq!(
            properties,
            [
                "property float x",
                "property float y",
                "property float z",
                "property uchar red",
                "property uchar green",
                "property uchar blue",
                "property uchar alpha",
            ]
        );
        assert!(output.contains("format ascii 1.0\n"));
    }

    #[test]
    fn single_red_vertex() {
        let vertex = Vertex {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec4::new(1.0, 0.0, 0.0, 1.0),
        };
        let output = text(&[vertex]);

        assert!(output.contains("element vertex 1\n"));
        assert_eq!(output.lines().last(), Some("1.0 2.0 3.0 255 0 0 255"));
    }

    #[test]
    fn fractional_values_and_channel_rounding() {
        let vertex = Vertex {
            position: Vec3::new(-0.25, 0.5, 1.125),
            color: Vec4::new(0.5, 1.5, -0.2, 0.999),
        };
        let output = text(&[vertex]);
        assert_eq!(output.lines().last(), Some("-0.25 0.5 1.125 128 255 0 255"));
    }

    #[test]
    fn color_byte_rounds_and_clamps() {
        assert_eq!(color_byte(0.0), 0);
        assert_eq!(color_byte(1.0), 255);
        assert_eq!(color_byte(0.2), 51);
        assert_eq!(color_byte(2.0), 255);
        assert_eq!(color_byte(-1.0), 0);
    }

    #[test]
    fn export_carries_suggested_name() {
        let export = export(&[]).unwrap();
        assert_eq!(export.file_name, "exported.ply");
        assert_eq!(export.content_type, "application/octet-stream");
        assert!(export.bytes.starts_with(b"ply\n"));
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        let vertices = [
            Vertex {
                position: Vec3::ZERO,
                color: Vec4::ONE,
            },
            Vertex {
                position: Vec3::X,
                color: Vec4::W,
            },
        ];

        export_to_path(&path, &vertices).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, serialize(&vertices).unwrap());
        assert!(String::from_utf8(written).unwrap().ends_with("1.0 0.0 0.0 0 0 0 255\n"));
    }
}
