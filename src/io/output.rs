//! To describe and do the dump of kernel matrices

use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use csv::WriterBuilder;
use ndarray::Array2;

/// only csv now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
}

pub struct Output {
    /// describe output format
    fmt: Format,
    /// name of output file
    output_name: String,
}

impl Output {
    /// if output_name is None, default output_name will be "kernel.csv"
    pub fn new(fmt: Format, output_name: &Option<String>) -> Self {
        let output_name = match output_name {
            Some(name) => {
                if name.ends_with(".csv") {
                    name.clone()
                } else {
                    let mut csv_name = name.clone();
                    csv_name.push_str(".csv");
                    csv_name
                }
            }
            None => String::from("kernel.csv"),
        };
        Output { fmt, output_name }
    }

    /// get ouput format
    pub fn get_fmt(&self) -> Format {
        self.fmt
    }

    /// get output_name
    pub fn get_output_name(&self) -> &String {
        &self.output_name
    }

    /// dumps km in the output file
    pub fn dump(&self, km: &Array2<f64>) -> anyhow::Result<()> {
        match self.fmt {
            Format::Csv => dump_kernel_matrix(Path::new(&self.output_name), km),
        }
    }
} // end of Output

impl Default for Output {
    fn default() -> Self {
        Output {
            fmt: Format::Csv,
            output_name: String::from("kernel.csv"),
        }
    }
}

/// writes a kernel matrix as a csv file, one row per line, no header
pub fn dump_kernel_matrix(path: &Path, km: &Array2<f64>) -> anyhow::Result<()> {
    log::debug!("entering dump_kernel_matrix, dim {:?}", km.dim());
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("could not open file : {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(BufWriter::new(file));
    for row in km.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    log::info!("dump of kernel matrix in {} done", path.display());
    Ok(())
} // end of dump_kernel_matrix

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn dump_and_read() {
        let path = std::env::temp_dir().join(format!("graphkern_km_{}.csv", std::process::id()));
        let km = arr2(&[[1., 0.5], [0.5, 1.]]);
        dump_kernel_matrix(&path, &km).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1,0.5\n0.5,1\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn output_names() {
        assert_eq!(Output::new(Format::Csv, &Some("mutag".to_string())).get_output_name(), "mutag.csv");
        assert_eq!(Output::new(Format::Csv, &Some("k.csv".to_string())).get_output_name(), "k.csv");
        assert_eq!(Output::default().get_output_name(), "kernel.csv");
    }
}
