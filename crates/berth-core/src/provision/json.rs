use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Mutex,
};

use tracing::debug;

use crate::{
    error::CoreError,
    plan::DeploymentPlan,
    provision::{ProvisionReport, Provisioner},
};

/// Writes the plan as pretty-printed JSON, one document per call.
pub struct JsonProvisioner {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonProvisioner {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Create (or truncate) `path` and write plans into it.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "plan output opened");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl Provisioner for JsonProvisioner {
    fn name(&self) -> &'static str {
        "json"
    }

    fn provision(&self, plan: &DeploymentPlan) -> Result<ProvisionReport, CoreError> {
        let doc = plan.to_json_pretty()?;
        let mut out = self.out.lock().map_err(|_| CoreError::Provision {
            provisioner: self.name().to_string(),
            reason: "output lock poisoned".to_string(),
        })?;
        out.write_all(doc.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;

        Ok(ProvisionReport {
            provisioner: self.name(),
            units: plan.units.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{params::apply_defaults, plan::build_plan, template::StackTemplate};
    use std::{io, sync::Arc};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_json_document() {
        let buf = Shared::default();
        let prov = JsonProvisioner::new(buf.clone());
        let decl = apply_defaults(&StackTemplate::default().render()).unwrap();
        let plan = build_plan(&decl).unwrap();

        let report = prov.provision(&plan).unwrap();
        assert_eq!(report.provisioner, "json");

        let bytes = buf.0.lock().unwrap().clone();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["stack"], "earnipay");
        assert_eq!(value["units"].as_array().map(Vec::len), Some(3));
    }
}
