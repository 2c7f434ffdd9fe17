//! Little-endian f32 vector (de)serialization shared by both backends, and
//! the exact-scan distance function the SQLite backend ranks by.

pub fn serialize_f32(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for f in v {
        out.extend_from_slice(&f.to_le_bytes());
    }
    out
}

pub fn deserialize_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let v = vec![1.0_f32, -2.5, 3.125];
        assert_eq!(deserialize_f32(&serialize_f32(&v)), v);
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert_eq!(l2_distance(&v, &v), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = vec![0.0_f32, 0.0];
        let b = vec![3.0_f32, 4.0];
        assert_eq!(l2_distance(&a, &b), 5.0);
        assert_eq!(l2_distance(&b, &a), 5.0);
    }
}
