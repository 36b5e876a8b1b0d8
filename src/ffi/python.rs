// In: src/ffi/python.rs

use log::LevelFilter;
use pyo3::exceptions::{PyBlockingIOError, PyException, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::config::PipelineConfig;
use crate::ffi::ioadapters::PyStreamRuntime;
use crate::observability::init_logging;
use crate::pipeline::{ChainPlan, Pipeline};
use crate::source::{ForeignStreamSource, MemorySource};
use crate::types::{Direction, Signal};

pyo3::create_exception!(sevenpull, SevenPullError, PyException);

fn parse_direction(direction: &str) -> PyResult<Direction> {
    match direction.to_lowercase().as_str() {
        "decode" => Ok(Direction::Decode),
        "encode" => Ok(Direction::Encode),
        _ => Err(PyValueError::new_err(
            "Invalid direction. Must be 'decode' or 'encode'.",
        )),
    }
}

fn parse_config(config_json: Option<&str>) -> PyResult<PipelineConfig> {
    match config_json {
        Some(json) => Ok(PipelineConfig::from_json(json)?),
        None => Ok(PipelineConfig::default()),
    }
}

//==================================================================================
// I. Streaming API
//==================================================================================

/// A pull pipeline reading from a Python stream object.
#[pyclass(name = "Pipeline", module = "sevenpull")]
pub struct PyPipeline {
    inner: Option<Pipeline>,
}

impl PyPipeline {
    fn pipeline(&mut self) -> PyResult<&mut Pipeline> {
        self.inner
            .as_mut()
            .ok_or_else(|| PyValueError::new_err("Pipeline has been closed"))
    }
}

#[pymethods]
impl PyPipeline {
    /// `plan_json` lists the stages, e.g. `{"stages": [{"method": "zstd"}]}`.
    #[new]
    #[pyo3(signature = (stream, plan_json, direction = "decode", config_json = None))]
    fn new(
        stream: PyObject,
        plan_json: &str,
        direction: &str,
        config_json: Option<&str>,
    ) -> PyResult<Self> {
        let plan = ChainPlan::from_json(plan_json)?;
        let config = parse_config(config_json)?;
        let direction = parse_direction(direction)?;
        let source = ForeignStreamSource::new(PyStreamRuntime::new(stream))?;
        let pipeline = Pipeline::new(source, &plan.stages, direction, &config)?;
        Ok(Self {
            inner: Some(pipeline),
        })
    }

    /// Returns up to `size` bytes; `b""` at end of stream.
    ///
    /// Raises `BlockingIOError` when the source is not ready yet and
    /// `SevenPullError` on any fault.
    #[pyo3(signature = (size = 65536))]
    fn pull(&mut self, py: Python<'_>, size: usize) -> PyResult<PyObject> {
        let pipeline = self.pipeline()?;
        let mut buf = vec![0u8; size];
        let signal = py.allow_threads(|| pipeline.pull(&mut buf))?;
        match signal {
            Signal::Ok(n) => Ok(PyBytes::new_bound(py, &buf[..n]).into_py(py)),
            Signal::Eof => Ok(PyBytes::new_bound(py, b"").into_py(py)),
            Signal::NeedsRetry => Err(PyBlockingIOError::new_err(
                "source is not ready; pull again",
            )),
        }
    }

    /// Drains the pipeline and returns everything it produces.
    fn read_all<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let pipeline = self.pipeline()?;
        let out = py.allow_threads(|| pipeline.read_to_end())?;
        Ok(PyBytes::new_bound(py, &out))
    }

    #[getter]
    fn bytes_produced(&self) -> u64 {
        self.inner.as_ref().map_or(0, Pipeline::bytes_produced)
    }

    #[getter]
    fn bytes_consumed(&self) -> u64 {
        self.inner.as_ref().map_or(0, Pipeline::bytes_consumed)
    }

    /// Releases the pipeline and the stream it holds.
    fn close(&mut self) {
        self.inner = None;
    }
}

//==================================================================================
// II. One-Shot API
//==================================================================================

fn run_bytes(
    py: Python<'_>,
    data: &[u8],
    plan_json: &str,
    config_json: Option<&str>,
    direction: Direction,
) -> PyResult<Vec<u8>> {
    let plan = ChainPlan::from_json(plan_json)?;
    let config = parse_config(config_json)?;
    let source = MemorySource::new(data.to_vec());
    let out = py.allow_threads(move || {
        Pipeline::new(source, &plan.stages, direction, &config)?.read_to_end()
    })?;
    Ok(out)
}

/// Encodes `data` through the chain in `plan_json`.
#[pyfunction]
#[pyo3(name = "encode_bytes", signature = (data, plan_json, config_json = None))]
pub fn encode_bytes_py<'py>(
    py: Python<'py>,
    data: &[u8],
    plan_json: &str,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyBytes>> {
    let out = run_bytes(py, data, plan_json, config_json, Direction::Encode)?;
    Ok(PyBytes::new_bound(py, &out))
}

/// Decodes `data` through the chain in `plan_json`.
#[pyfunction]
#[pyo3(name = "decode_bytes", signature = (data, plan_json, config_json = None))]
pub fn decode_bytes_py<'py>(
    py: Python<'py>,
    data: &[u8],
    plan_json: &str,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyBytes>> {
    let out = run_bytes(py, data, plan_json, config_json, Direction::Decode)?;
    Ok(PyBytes::new_bound(py, &out))
}

//==================================================================================
// III. Logging
//==================================================================================

#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None, level = "info"))]
pub fn enable_verbose_logging_py(log_file: Option<String>, level: &str) -> PyResult<()> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| PyValueError::new_err(format!("Invalid log level '{}'", level)))?;
    init_logging(level, log_file.as_deref())?;
    Ok(())
}
