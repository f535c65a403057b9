// transform.rs

use glam::Mat4;

use crate::error::{BodyTrackError, Result};

/// Number of values in a flattened transform.
pub const TRANSFORM_LEN: usize = 16;

/// Flattens a transform into 16 values in row-major order.
///
/// The translation ends up at indices 3, 7 and 11. glam stores matrices
/// column-major, so this is the column array of the transpose.
pub fn flatten(transform: &Mat4) -> [f32; TRANSFORM_LEN] {
    transform.transpose().to_cols_array()
}

/// Rebuilds a transform from 16 row-major values.
pub fn unflatten(values: &[f32]) -> Result<Mat4> {
    let values: &[f32; TRANSFORM_LEN] = values.try_into().map_err(|_| {
        BodyTrackError::MalformedPayload(format!(
            "transform needs {} values, got {}",
            TRANSFORM_LEN,
            values.len()
        ))
    })?;
    Ok(Mat4::from_cols_array(values).transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn translation_lands_in_last_column_of_each_row() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let flat = flatten(&m);
        assert_eq!((flat[3], flat[7], flat[11], flat[15]), (1.0, 2.0, 3.0, 1.0));
        assert_eq!(flat[12], 0.0);
    }

    #[test]
    fn round_trip_is_exact() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(0.5, 1.25, 2.0),
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, -1.1, 2.7),
            Vec3::new(-4.0, 0.125, 9.5),
        );
        let flat = flatten(&m);
        let back = unflatten(&flat).unwrap();
        assert_eq!(back.to_cols_array(), m.to_cols_array());
        assert_eq!(flatten(&back), flat);

        let raw: Vec<f32> = (0..16).map(|i| i as f32 * 0.1 - 0.7).collect();
        assert_eq!(flatten(&unflatten(&raw).unwrap()).to_vec(), raw);
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert!(matches!(unflatten(&[0.0; 15]), Err(BodyTrackError::MalformedPayload(_))));
        assert!(matches!(unflatten(&[0.0; 17]), Err(BodyTrackError::MalformedPayload(_))));
    }
}
