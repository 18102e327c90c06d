use crate::core::car::CarPars;
use crate::core::race::SimConstants;
use anyhow::Context;
use helpers::general::InputValueError;
use std::collections::HashMap;
use std::fmt::Write;
use std::fs::OpenOptions;
use std::path::Path;

/// OptionValue is one entry of the options store: `$key=k1,v1,k2,v2` is a map, `%key=a,b` a
/// list.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Map(Vec<(String, String)>),
    List(Vec<String>),
}

/// Options keeps the entries of the options file in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn get_map(&self, key: &str) -> Option<&[(String, String)]> {
        match self.get(key) {
            Some(OptionValue::Map(pairs)) => Some(pairs.as_slice()),
            _ => None,
        }
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        match self.get(key) {
            Some(OptionValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// set replaces an existing entry in place or appends a new one.
    pub fn set(&mut self, key: &str, value: OptionValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }

    pub fn to_options_string(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();
        for (key, value) in self.entries.iter() {
            let line = match value {
                OptionValue::Map(pairs) => format!(
                    "${}={}",
                    key,
                    pairs
                        .iter()
                        .map(|(k, v)| format!("{},{}", k, v))
                        .collect::<Vec<String>>()
                        .join(",")
                ),
                OptionValue::List(items) => format!("%{}={}", key, items.join(",")),
            };
            writeln!(&mut content, "{}", line)?;
        }
        Ok(content)
    }

    pub fn write_to_file(&self, filepath: &Path) -> anyhow::Result<()> {
        std::fs::write(filepath, self.to_options_string()?).context(format!(
            "Failed to write options file {}!",
            filepath.display()
        ))
    }
}

/// parse_options decodes the options store. Lines not starting with `$` or `%` are ignored.
pub fn parse_options(content: &str) -> anyhow::Result<Options> {
    let mut options = Options::default();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim_end();
        let (is_map, body) = if let Some(body) = line.strip_prefix('$') {
            (true, body)
        } else if let Some(body) = line.strip_prefix('%') {
            (false, body)
        } else {
            continue;
        };

        let (key, raw) = body.split_once('=').ok_or_else(|| {
            InputValueError::new(format!("line {}: missing '=' in {:?}", i + 1, line))
        })?;
        let parts: Vec<String> = raw.split(',').map(|p| p.trim().to_owned()).collect();

        let value = if is_map {
            if parts.len() % 2 != 0 {
                return Err(InputValueError::new(format!(
                    "line {}: map {:?} has an odd number of fields",
                    i + 1,
                    key
                ))
                .into());
            }
            OptionValue::Map(
                parts
                    .chunks(2)
                    .map(|kv| (kv[0].to_owned(), kv[1].to_owned()))
                    .collect(),
            )
        } else {
            OptionValue::List(parts)
        };

        options.set(key, value);
    }

    Ok(options)
}

pub fn read_options(filepath: &Path) -> anyhow::Result<Options> {
    let content = std::fs::read_to_string(filepath).context(format!(
        "Failed to open options file {}!",
        filepath.display()
    ))?;
    parse_options(&content).context(format!(
        "Failed to parse options file {}!",
        filepath.display()
    ))
}

/// SimPars holds the car related parameters resolved from the options store.
/// * `car_types` - Car model names, indexed by car model id
/// * `car_pars_all` - Tuning constants per car model name
/// * `chosen_car` - Car model id driven by the player
/// * `chosen_variant` - Visual variant of the player's car
#[derive(Debug, Clone)]
pub struct SimPars {
    pub car_types: Vec<String>,
    pub car_pars_all: HashMap<String, CarPars>,
    pub chosen_car: usize,
    pub chosen_variant: String,
}

impl SimPars {
    pub fn from_options(options: &Options) -> anyhow::Result<SimPars> {
        let car_types = options
            .get_list("car_types")
            .ok_or_else(|| InputValueError::new("options are missing the 'car_types' list"))?
            .to_vec();

        let attributes = options.get_map("car_attributes").ok_or_else(|| {
            InputValueError::new("options are missing the 'car_attributes' map")
        })?;

        let mut car_pars_all = HashMap::with_capacity(attributes.len());
        for (name, raw) in attributes.iter() {
            let car_pars: CarPars = raw
                .parse()
                .context(format!("Invalid attributes for car model {:?}!", name))?;
            car_pars_all.insert(name.to_owned(), car_pars);
        }

        let (chosen_car, chosen_variant) = match options.get_list("chosen_car") {
            Some(items) if !items.is_empty() => {
                let id = items[0]
                    .parse::<usize>()
                    .context(format!("Could not parse chosen car {:?}!", items[0]))?;
                let variant = items.get(1).cloned().unwrap_or_else(|| "1".to_owned());
                (id, variant)
            }
            _ => (0, "1".to_owned()),
        };

        Ok(SimPars {
            car_types,
            car_pars_all,
            chosen_car,
            chosen_variant,
        })
    }

    /// car_pars_for_model resolves model name and tuning constants for a car model id.
    pub fn car_pars_for_model(&self, model_id: usize) -> anyhow::Result<(&str, CarPars)> {
        let name = self.car_types.get(model_id).ok_or_else(|| {
            InputValueError::new(format!(
                "car model id {} is outside the {} known car types",
                model_id,
                self.car_types.len()
            ))
        })?;
        let car_pars = self.car_pars_all.get(name).ok_or_else(|| {
            InputValueError::new(format!("no car attributes for car model {:?}", name))
        })?;
        Ok((name.as_str(), *car_pars))
    }
}

/// read_sim_pars reads the options file and resolves the car parameters.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let options = read_options(filepath)?;
    SimPars::from_options(&options).context(format!(
        "Failed to resolve car parameters from {}!",
        filepath.display()
    ))
}

/// Read simulation constants from a JSON file. Missing fields keep their defaults.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;

    let consts = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;
    Ok(consts)
}
