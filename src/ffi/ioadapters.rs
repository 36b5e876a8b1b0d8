// In: src/ffi/ioadapters.rs

//! `ForeignRuntime` over a Python file-like object.
//!
//! The wrapped object must expose `read(buffer: bytearray, max_len: int)`,
//! filling the front of `buffer` and returning `(bytes_read, status)`. A plain
//! integer return is accepted as `bytes_read` with status 0, which lets
//! `readinto`-style callables be bound directly.

use pyo3::prelude::*;
use pyo3::types::PyByteArray;

use crate::error::{Fault, FaultKind};
use crate::source::foreign::{checked_prefix, ReadReturn};
use crate::source::{ForeignCall, ForeignRuntime};

pub struct PyStreamRuntime {
    obj: PyObject,
    name: String,
    pending: Option<PyErr>,
}

impl PyStreamRuntime {
    pub fn new(obj: PyObject) -> Self {
        let name = Python::with_gil(|py| {
            obj.bind(py)
                .repr()
                .map(|r| r.to_string())
                .unwrap_or_else(|_| "<python object>".to_string())
        });
        Self {
            obj,
            name,
            pending: None,
        }
    }
}

impl ForeignRuntime for PyStreamRuntime {
    type Method = PyObject;
    type Buffer = Py<PyByteArray>;

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn resolve_read(&mut self) -> Result<PyObject, Fault> {
        Python::with_gil(|py| {
            let read = self.obj.bind(py).getattr("read").map_err(|e| {
                Fault::new(
                    FaultKind::MissingCapability,
                    format!("{} has no read method: {}", self.name, e),
                )
            })?;
            if !read.is_callable() {
                return Err(Fault::new(
                    FaultKind::MissingCapability,
                    format!("{}.read is not callable", self.name),
                ));
            }
            Ok(read.unbind())
        })
    }

    fn alloc_buffer(&mut self, len: usize) -> Result<Py<PyByteArray>, Fault> {
        Python::with_gil(|py| {
            PyByteArray::new_bound_with(py, len, |_| Ok(()))
                .map(Bound::unbind)
                .map_err(|e| Fault::exhausted(format!("bytearray({}): {}", len, e)))
        })
    }

    fn release_buffer(&mut self, buffer: Py<PyByteArray>) {
        // Dropping with the GIL held releases the reference immediately.
        Python::with_gil(|_py| drop(buffer));
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        Python::with_gil(|py| {
            if let Some(stale) = PyErr::take(py) {
                log::debug!("discarding stale python exception: {}", stale);
            }
        });
    }

    fn take_pending(&mut self) -> Option<String> {
        self.pending.take().map(|e| e.to_string())
    }

    fn invoke_read(
        &mut self,
        method: &PyObject,
        buffer: &mut Py<PyByteArray>,
        max_len: usize,
    ) -> ForeignCall {
        let outcome = Python::with_gil(|py| -> PyResult<ForeignCall> {
            let ret = method.call1(py, (buffer.clone_ref(py), max_len))?;
            let ret = ret.bind(py);
            let parsed = match ret.extract::<(i64, i32)>() {
                Ok((bytes_read, status)) => ReadReturn::CountAndStatus(bytes_read, status),
                Err(_) => ReadReturn::Count(ret.extract::<i64>()?),
            };
            Ok(parsed.into())
        });
        match outcome {
            Ok(call) => call,
            Err(e) => {
                self.pending = Some(e);
                ForeignCall {
                    status: 0,
                    bytes_read: 0,
                }
            }
        }
    }

    fn copy_out(&mut self, buffer: &Py<PyByteArray>, dst: &mut [u8]) -> Result<(), Fault> {
        Python::with_gil(|py| {
            let bound = buffer.bind(py);
            // SAFETY: the GIL is held and no Python code runs while the slice
            // is borrowed, so nothing can resize or free the bytearray.
            let bytes = unsafe { bound.as_bytes() };
            dst.copy_from_slice(checked_prefix(bytes, dst.len())?);
            Ok(())
        })
    }
}
