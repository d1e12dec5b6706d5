//! In-memory tabular data: instances with float, integer and nominal attributes and a class label.
//!
//! Missing values are encoded by the attribute kind:
//!  - float attributes : any non finite value (NaN, +-inf)
//!  - integer and nominal attributes : `None`
//!
//! Nominal values are stored as indexes in a per attribute vocabulary kept by the [Dataset].
//! Instances do not refer back to their dataset, the dataset is passed along when the schema is needed.

use anyhow::anyhow;

use indexmap::set::IndexSet;

use num_traits::Float;

/// A data point
#[derive(Clone, Debug)]
pub struct Instance<F> {
    /// float attributes, non finite values are missing
    pub floats: Vec<F>,
    /// integer attributes
    pub ints: Vec<Option<i64>>,
    /// nominal attributes as index in attribute vocabulary
    pub nominals: Vec<Option<usize>>,
    /// class label
    pub label: usize,
} // end of struct Instance

impl<F: Float> Instance<F> {
    pub fn new(
        floats: Vec<F>,
        ints: Vec<Option<i64>>,
        nominals: Vec<Option<usize>>,
        label: usize,
    ) -> Self {
        Instance {
            floats,
            ints,
            nominals,
            label,
        }
    }

    /// an instance with only float attributes
    pub fn from_floats(floats: Vec<F>, label: usize) -> Self {
        Instance {
            floats,
            ints: Vec::new(),
            nominals: Vec::new(),
            label,
        }
    }

    pub fn get_label(&self) -> usize {
        self.label
    }
} // end of impl Instance

//=====================================================================================

/// Dataset owns its instances and the attribute schema.
#[derive(Clone, Debug)]
pub struct Dataset<F> {
    float_names: Vec<String>,
    int_names: Vec<String>,
    nominal_names: Vec<String>,
    /// vocabulary\[a\] maps values of nominal attribute a to their index
    vocabularies: Vec<IndexSet<String>>,
    instances: Vec<Instance<F>>,
} // end of struct Dataset

impl<F: Float> Dataset<F> {
    /// allocates an empty dataset with the given attribute names
    pub fn new(float_names: Vec<String>, int_names: Vec<String>, nominal_names: Vec<String>) -> Self {
        let vocabularies = (0..nominal_names.len()).map(|_| IndexSet::new()).collect();
        Dataset {
            float_names,
            int_names,
            nominal_names,
            vocabularies,
            instances: Vec::new(),
        }
    } // end of new

    /// builds a dataset with float attributes only. Attributes are named "f0", "f1" ...
    pub fn from_float_rows(rows: Vec<Vec<F>>, labels: &[usize]) -> anyhow::Result<Self> {
        if rows.len() != labels.len() {
            log::error!(
                "Dataset::from_float_rows got {} rows and {} labels",
                rows.len(),
                labels.len()
            );
            return Err(anyhow!(
                "number of rows {} differs from number of labels {}",
                rows.len(),
                labels.len()
            ));
        }
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let float_names = (0..dim).map(|i| format!("f{}", i)).collect();
        let mut dataset = Dataset::new(float_names, Vec::new(), Vec::new());
        dataset.instances.reserve(rows.len());
        for (row, label) in rows.into_iter().zip(labels.iter()) {
            dataset.add_instance(Instance::from_floats(row, *label))?;
        }
        Ok(dataset)
    } // end of from_float_rows

    /// add an instance, checking it conforms to the schema
    pub fn add_instance(&mut self, instance: Instance<F>) -> anyhow::Result<()> {
        if instance.floats.len() != self.float_names.len()
            || instance.ints.len() != self.int_names.len()
            || instance.nominals.len() != self.nominal_names.len()
        {
            log::error!("Dataset::add_instance instance {} does not conform to schema", self.instances.len());
            return Err(anyhow!(
                "instance {} has ({}, {}, {}) attributes, schema expects ({}, {}, {})",
                self.instances.len(),
                instance.floats.len(),
                instance.ints.len(),
                instance.nominals.len(),
                self.float_names.len(),
                self.int_names.len(),
                self.nominal_names.len()
            ));
        }
        for (a, value) in instance.nominals.iter().enumerate() {
            if let Some(v) = value {
                if *v >= self.vocabularies[a].len() {
                    log::error!("Dataset::add_instance nominal value index {} out of vocabulary", v);
                    return Err(anyhow!(
                        "nominal attribute {} : value index {} not in vocabulary of size {}",
                        self.nominal_names[a],
                        v,
                        self.vocabularies[a].len()
                    ));
                }
            }
        }
        self.instances.push(instance);
        Ok(())
    } // end of add_instance

    /// registers value in vocabulary of nominal attribute attr and returns its index.
    /// A value already present keeps its index.
    pub fn nominal_index(&mut self, attr: usize, value: &str) -> anyhow::Result<usize> {
        if attr >= self.vocabularies.len() {
            log::error!("Dataset::nominal_index no nominal attribute {}", attr);
            return Err(anyhow!(
                "nominal attribute {} does not exist, dataset has {}",
                attr,
                self.vocabularies.len()
            ));
        }
        let (index, _) = self.vocabularies[attr].insert_full(value.to_string());
        Ok(index)
    } // end of nominal_index

    /// returns the string value of a nominal index
    pub fn nominal_value(&self, attr: usize, index: usize) -> Option<&String> {
        self.vocabularies.get(attr).and_then(|v| v.get_index(index))
    }

    pub fn size(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get_instance(&self, i: usize) -> &Instance<F> {
        &self.instances[i]
    }

    pub fn get_instances(&self) -> &[Instance<F>] {
        &self.instances
    }

    /// labels in instance order
    pub fn get_labels(&self) -> Vec<usize> {
        self.instances.iter().map(|i| i.label).collect()
    }

    /// number of classes, deduced as max label + 1
    pub fn get_nb_classes(&self) -> usize {
        self.instances.iter().map(|i| i.label + 1).max().unwrap_or(0)
    }

    pub fn get_nb_float_attr(&self) -> usize {
        self.float_names.len()
    }

    pub fn get_nb_int_attr(&self) -> usize {
        self.int_names.len()
    }

    pub fn get_nb_nominal_attr(&self) -> usize {
        self.nominal_names.len()
    }
} // end of impl Dataset

//========================================================================================

#[cfg(test)]
mod tests {

    //    cargo test dataset  -- --nocapture

    use super::*;

    #[test]
    fn test_from_float_rows() {
        let rows = vec![vec![0f32, 1.], vec![2., 3.], vec![4., 5.]];
        let data = Dataset::from_float_rows(rows, &[0, 2, 1]).unwrap();
        assert_eq!(data.size(), 3);
        assert_eq!(data.get_nb_float_attr(), 2);
        assert_eq!(data.get_nb_classes(), 3);
        assert_eq!(data.get_labels(), vec![0, 2, 1]);
    } // end of test_from_float_rows

    #[test]
    fn test_bad_shapes() {
        let rows = vec![vec![0f64, 1.], vec![2.]];
        assert!(Dataset::from_float_rows(rows.clone(), &[0]).is_err());
        assert!(Dataset::from_float_rows(rows, &[0, 1]).is_err());
    } // end of test_bad_shapes

    #[test]
    fn test_nominal_vocabulary() {
        let mut data = Dataset::<f32>::new(
            vec![String::from("x")],
            vec![String::from("n")],
            vec![String::from("color")],
        );
        let red = data.nominal_index(0, "red").unwrap();
        let blue = data.nominal_index(0, "blue").unwrap();
        assert_eq!(data.nominal_index(0, "red").unwrap(), red);
        assert_ne!(red, blue);
        assert_eq!(data.nominal_value(0, blue).unwrap(), "blue");
        assert!(data.nominal_index(1, "red").is_err());
        //
        let ok = Instance::new(vec![1.], vec![Some(3)], vec![Some(blue)], 0);
        assert!(data.add_instance(ok).is_ok());
        let missing = Instance::new(vec![f32::NAN], vec![None], vec![None], 1);
        assert!(data.add_instance(missing).is_ok());
        let unknown = Instance::new(vec![1.], vec![Some(3)], vec![Some(7)], 0);
        assert!(data.add_instance(unknown).is_err());
        assert_eq!(data.size(), 2);
    } // end of test_nominal_vocabulary
} // end of mod tests
