use std::borrow::Cow;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{allocator::TensorAllocator, Tensor};

/// The wire form of a tensor: the raw buffer plus its shape and strides.
#[derive(Serialize, Deserialize)]
#[serde(rename = "Tensor")]
struct TensorRepr<'a, T: Clone> {
    data: Cow<'a, [T]>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T, const N: usize, A> Serialize for Tensor<T, N, A>
where
    T: Serialize + Clone,
    A: TensorAllocator,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TensorRepr {
            data: Cow::Borrowed(self.as_slice()),
            shape: self.shape.to_vec(),
            strides: self.strides.to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de, T, const N: usize, A> Deserialize<'de> for Tensor<T, N, A>
where
    T: Deserialize<'de> + Clone,
    A: TensorAllocator + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = TensorRepr::<T>::deserialize(deserializer)?;

        let shape: [usize; N] = repr
            .shape
            .try_into()
            .map_err(|s: Vec<usize>| D::Error::custom(format!("expected rank {N}, got {}", s.len())))?;
        let strides: [usize; N] = repr
            .strides
            .try_into()
            .map_err(|s: Vec<usize>| D::Error::custom(format!("expected {N} strides, got {}", s.len())))?;

        let mut tensor = Tensor::from_shape_vec(shape, repr.data.into_owned(), A::default())
            .map_err(D::Error::custom)?;

        // the last addressed element must lie inside the buffer
        let last = shape
            .iter()
            .zip(&strides)
            .map(|(&n, &s)| n.saturating_sub(1).saturating_mul(s))
            .fold(0usize, usize::saturating_add);
        if tensor.numel() > 0 && last >= tensor.numel() {
            return Err(D::Error::custom(format!(
                "strides {strides:?} address past the end of {} elements",
                tensor.numel()
            )));
        }
        tensor.strides = strides;

        Ok(tensor)
    }
}
