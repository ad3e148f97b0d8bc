use crate::{
    band::FrequencyBand,
    cfg::{AdapterConfig, Error, MeasurementType, ServiceAccess},
};

/// Adapter parameters reachable by label, for scripting layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    RangeModuloConstant,
    DopplerCountInterval,
    ServiceAccess,
    Node4Frequency,
    Node4Band,
    SmarId,
    DataFlag,
    AddNoise,
    AddBias,
    RangeOnly,
    ErrorModel,
    NoiseSigma,
    Bias,
    MeasurementType,
    UseTaylorSeries,
    WithMediaCorrection,
    WithLightTime,
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::RangeModuloConstant => write!(f, "RangeModuloConstant"),
            Self::DopplerCountInterval => write!(f, "DopplerCountInterval"),
            Self::ServiceAccess => write!(f, "ServiceAccess"),
            Self::Node4Frequency => write!(f, "Node4Frequency"),
            Self::Node4Band => write!(f, "Node4Band"),
            Self::SmarId => write!(f, "SmarId"),
            Self::DataFlag => write!(f, "DataFlag"),
            Self::AddNoise => write!(f, "AddNoise"),
            Self::AddBias => write!(f, "AddBias"),
            Self::RangeOnly => write!(f, "RangeOnly"),
            Self::ErrorModel => write!(f, "ErrorModel"),
            Self::NoiseSigma => write!(f, "NoiseSigma"),
            Self::Bias => write!(f, "Bias"),
            Self::MeasurementType => write!(f, "MeasurementType"),
            Self::UseTaylorSeries => write!(f, "UseTaylorSeries"),
            Self::WithMediaCorrection => write!(f, "WithMediaCorrection"),
            Self::WithLightTime => write!(f, "WithLightTime"),
        }
    }
}

impl std::str::FromStr for Parameter {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "rangemoduloconstant" => Ok(Self::RangeModuloConstant),
            "dopplercountinterval" => Ok(Self::DopplerCountInterval),
            "serviceaccess" => Ok(Self::ServiceAccess),
            "node4frequency" => Ok(Self::Node4Frequency),
            "node4band" => Ok(Self::Node4Band),
            "smarid" => Ok(Self::SmarId),
            "dataflag" => Ok(Self::DataFlag),
            "addnoise" => Ok(Self::AddNoise),
            "addbias" => Ok(Self::AddBias),
            "rangeonly" => Ok(Self::RangeOnly),
            "errormodel" => Ok(Self::ErrorModel),
            "noisesigma" => Ok(Self::NoiseSigma),
            "bias" => Ok(Self::Bias),
            "measurementtype" => Ok(Self::MeasurementType),
            "usetaylorseries" => Ok(Self::UseTaylorSeries),
            "withmediacorrection" => Ok(Self::WithMediaCorrection),
            "withlighttime" => Ok(Self::WithLightTime),
            _ => Err(Error::UnknownParameter(s.to_string())),
        }
    }
}

impl AdapterConfig {
    /// Sets a real valued parameter by label
    pub fn set_real_parameter(&mut self, label: &str, value: f64) -> Result<(), Error> {
        match label.parse::<Parameter>()? {
            Parameter::RangeModuloConstant => self.set_range_modulo(value),
            Parameter::DopplerCountInterval => self.set_doppler_count_interval(value),
            Parameter::Node4Frequency => {
                self.tdrs.node4_frequency_mhz = value;
                Ok(())
            },
            Parameter::NoiseSigma => self.set_noise_sigma(value),
            Parameter::Bias => {
                self.error_model.bias = value;
                Ok(())
            },
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }

    /// Real valued parameter, by label
    pub fn get_real_parameter(&self, label: &str) -> Result<f64, Error> {
        match label.parse::<Parameter>()? {
            Parameter::RangeModuloConstant => Ok(self.range_modulo),
            Parameter::DopplerCountInterval => Ok(self.doppler_count_interval),
            Parameter::Node4Frequency => Ok(self.tdrs.node4_frequency_mhz),
            Parameter::NoiseSigma => Ok(self.error_model.noise_sigma),
            Parameter::Bias => Ok(self.error_model.bias),
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }

    /// Sets an integer parameter by label
    pub fn set_integer_parameter(&mut self, label: &str, value: i32) -> Result<(), Error> {
        match label.parse::<Parameter>()? {
            Parameter::Node4Band => {
                self.tdrs.node4_band = FrequencyBand::from_code(value)?;
            },
            Parameter::SmarId => {
                self.tdrs.smar_id = value;
            },
            Parameter::DataFlag => {
                self.tdrs.data_flag = value;
            },
            _ => return Err(Error::ParameterType(label.to_string())),
        }
        Ok(())
    }

    /// Integer parameter, by label
    pub fn get_integer_parameter(&self, label: &str) -> Result<i32, Error> {
        match label.parse::<Parameter>()? {
            Parameter::Node4Band => Ok(self.tdrs.node4_band.code()),
            Parameter::SmarId => Ok(self.tdrs.smar_id),
            Parameter::DataFlag => Ok(self.tdrs.data_flag),
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }

    /// Sets a boolean parameter by label
    pub fn set_boolean_parameter(&mut self, label: &str, value: bool) -> Result<(), Error> {
        match label.parse::<Parameter>()? {
            Parameter::AddNoise => self.add_noise = value,
            Parameter::AddBias => self.add_bias = value,
            Parameter::RangeOnly => self.range_only = value,
            Parameter::UseTaylorSeries => self.use_taylor_series = value,
            Parameter::WithMediaCorrection => self.with_media_correction = value,
            Parameter::WithLightTime => self.with_light_time = value,
            _ => return Err(Error::ParameterType(label.to_string())),
        }
        Ok(())
    }

    /// Boolean parameter, by label
    pub fn get_boolean_parameter(&self, label: &str) -> Result<bool, Error> {
        match label.parse::<Parameter>()? {
            Parameter::AddNoise => Ok(self.add_noise),
            Parameter::AddBias => Ok(self.add_bias),
            Parameter::RangeOnly => Ok(self.range_only),
            Parameter::UseTaylorSeries => Ok(self.use_taylor_series),
            Parameter::WithMediaCorrection => Ok(self.with_media_correction),
            Parameter::WithLightTime => Ok(self.with_light_time),
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }

    /// Sets a string parameter by label.
    /// "ServiceAccess" appends to the service access list.
    pub fn set_string_parameter(&mut self, label: &str, value: &str) -> Result<(), Error> {
        match label.parse::<Parameter>()? {
            Parameter::ErrorModel => {
                self.error_model.noise_model = value.parse()?;
            },
            Parameter::MeasurementType => {
                self.measurement_type = value.parse::<MeasurementType>()?;
            },
            Parameter::ServiceAccess => {
                let service = value.parse::<ServiceAccess>()?;
                self.tdrs.service_access.push(service);
            },
            Parameter::Node4Band => {
                self.tdrs.node4_band = value.parse()?;
            },
            _ => return Err(Error::ParameterType(label.to_string())),
        }
        Ok(())
    }

    /// String parameter, by label.
    pub fn get_string_parameter(&self, label: &str) -> Result<String, Error> {
        match label.parse::<Parameter>()? {
            Parameter::ErrorModel => Ok(self.error_model.noise_model.to_string()),
            Parameter::MeasurementType => Ok(self.measurement_type.to_string()),
            Parameter::Node4Band => Ok(self.tdrs.node4_band.to_string()),
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }

    /// String array parameter ("ServiceAccess"), by label
    pub fn get_string_array_parameter(&self, label: &str) -> Result<Vec<String>, Error> {
        match label.parse::<Parameter>()? {
            Parameter::ServiceAccess => Ok(self
                .tdrs
                .service_access
                .iter()
                .map(|s| s.to_string())
                .collect()),
            _ => Err(Error::ParameterType(label.to_string())),
        }
    }
}
