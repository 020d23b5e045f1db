//! Tabla estática de sensores y actuadores.
//!
//! Esta tabla es la única fuente de verdad acerca de qué llamadas a
//! métodos reconoce el lenguaje y a qué códigos numéricos se traducen.
//! Las llamadas se identifican por el par `(receptor, método)`. Un par
//! ausente de la tabla es un error explícito, nunca una comparación de
//! cadenas que falla en tiempo de ejecución.
//!
//! El sensor de color es el único caso donde el argumento también forma
//! parte de la llave: `color_sensor.is_object(RED)` y
//! `color_sensor.is_object(BLUE)` leen sensores distintos.

use std::fmt::{self, Display};
use thiserror::Error;

use crate::{
    bytecode::{Opcode, Operand},
    lex::{Color, Tune},
};

/// Llamada no reconocida por la tabla.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Unknown sensor method `{receiver}.{method}`")]
    UnknownSensorMethod { receiver: String, method: String },

    #[error("Unknown actuator method `{receiver}.{method}`")]
    UnknownActuatorMethod { receiver: String, method: String },
}

/// Objeto receptor de una llamada, como `imu` en `imu.getPitch()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Receiver {
    Imu,
    LeftDistanceSensor,
    RightDistanceSensor,
    FrontDistanceSensor,
    ColorSensor,
    AllLeds,
    LeftLed,
    RightLed,
    Speaker,
}

impl Receiver {
    const NAMES: &'static [(&'static str, Receiver)] = &[
        ("imu",                   Receiver::Imu),
        ("left_distance_sensor",  Receiver::LeftDistanceSensor),
        ("right_distance_sensor", Receiver::RightDistanceSensor),
        ("front_distance_sensor", Receiver::FrontDistanceSensor),
        ("color_sensor",          Receiver::ColorSensor),
        ("all_leds",              Receiver::AllLeds),
        ("left_led",              Receiver::LeftLed),
        ("right_led",             Receiver::RightLed),
        ("speaker",               Receiver::Speaker),
    ];

    /// Busca un receptor por su nombre en código fuente.
    pub fn from_name(name: &str) -> Option<Self> {
        Receiver::NAMES
            .iter()
            .find(|&&(known, _)| known == name)
            .map(|&(_, receiver)| receiver)
    }

    /// Determina si el receptor produce lecturas en vez de recibir comandos.
    pub fn is_sensor(self) -> bool {
        matches!(
            self,
            Receiver::Imu
                | Receiver::LeftDistanceSensor
                | Receiver::RightDistanceSensor
                | Receiver::FrontDistanceSensor
                | Receiver::ColorSensor
        )
    }
}

/// Tipo de valor que produce un sensor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Numeric,
}

impl Display for ValueKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Boolean => fmt.write_str("boolean"),
            ValueKind::Numeric => fmt.write_str("numeric"),
        }
    }
}

/// Un sensor físico o virtual del robot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sensor {
    code: u16,
    kind: ValueKind,
    name: &'static str,
}

impl Sensor {
    pub const PITCH: Sensor = Sensor::numeric(0, "PITCH");
    pub const ROLL: Sensor = Sensor::numeric(1, "ROLL");
    pub const YAW: Sensor = Sensor::numeric(2, "YAW");
    pub const ACCEL_X: Sensor = Sensor::numeric(3, "ACCEL_X");
    pub const ACCEL_Y: Sensor = Sensor::numeric(4, "ACCEL_Y");
    pub const ACCEL_Z: Sensor = Sensor::numeric(5, "ACCEL_Z");
    pub const ACCEL_MAGNITUDE: Sensor = Sensor::numeric(6, "ACCEL_MAGNITUDE");
    pub const GYRO_X: Sensor = Sensor::numeric(7, "GYRO_X");
    pub const GYRO_Y: Sensor = Sensor::numeric(8, "GYRO_Y");
    pub const GYRO_Z: Sensor = Sensor::numeric(9, "GYRO_Z");
    pub const MAG_X: Sensor = Sensor::numeric(10, "MAG_X");
    pub const MAG_Y: Sensor = Sensor::numeric(11, "MAG_Y");
    pub const MAG_Z: Sensor = Sensor::numeric(12, "MAG_Z");
    pub const LEFT_PROXIMITY: Sensor = Sensor::boolean(13, "LEFT_PROXIMITY");
    pub const RIGHT_PROXIMITY: Sensor = Sensor::boolean(14, "RIGHT_PROXIMITY");
    pub const FRONT_DISTANCE: Sensor = Sensor::numeric(15, "FRONT_DISTANCE");
    pub const COLOR_RED: Sensor = Sensor::boolean(16, "COLOR_RED");
    pub const COLOR_GREEN: Sensor = Sensor::boolean(17, "COLOR_GREEN");
    pub const COLOR_BLUE: Sensor = Sensor::boolean(18, "COLOR_BLUE");
    pub const COLOR_YELLOW: Sensor = Sensor::boolean(19, "COLOR_YELLOW");
    pub const COLOR_WHITE: Sensor = Sensor::boolean(20, "COLOR_WHITE");
    pub const COLOR_BLACK: Sensor = Sensor::boolean(21, "COLOR_BLACK");

    const ALL: &'static [Sensor] = &[
        Sensor::PITCH,
        Sensor::ROLL,
        Sensor::YAW,
        Sensor::ACCEL_X,
        Sensor::ACCEL_Y,
        Sensor::ACCEL_Z,
        Sensor::ACCEL_MAGNITUDE,
        Sensor::GYRO_X,
        Sensor::GYRO_Y,
        Sensor::GYRO_Z,
        Sensor::MAG_X,
        Sensor::MAG_Y,
        Sensor::MAG_Z,
        Sensor::LEFT_PROXIMITY,
        Sensor::RIGHT_PROXIMITY,
        Sensor::FRONT_DISTANCE,
        Sensor::COLOR_RED,
        Sensor::COLOR_GREEN,
        Sensor::COLOR_BLUE,
        Sensor::COLOR_YELLOW,
        Sensor::COLOR_WHITE,
        Sensor::COLOR_BLACK,
    ];

    const fn numeric(code: u16, name: &'static str) -> Self {
        Sensor {
            code,
            kind: ValueKind::Numeric,
            name,
        }
    }

    const fn boolean(code: u16, name: &'static str) -> Self {
        Sensor {
            code,
            kind: ValueKind::Boolean,
            name,
        }
    }

    /// Código que recibe `READ_SENSOR`.
    pub fn code(self) -> u16 {
        self.code
    }

    /// Tipo de valor que produce la lectura.
    pub fn kind(self) -> ValueKind {
        self.kind
    }

    /// Nombre simbólico, usado en desensamblado.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Búsqueda inversa a partir de un código.
    pub fn from_code(code: Operand) -> Option<Self> {
        Sensor::ALL
            .iter()
            .copied()
            .find(|sensor| Operand::from(sensor.code) == code)
    }
}

/// Resultado de buscar un método de sensor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SensorMethod {
    /// El método identifica por sí solo a un sensor y no toma argumentos.
    Fixed(Sensor),

    /// El método toma un nombre de color, el cual elige el sensor.
    ByColor(&'static [(Color, Sensor)]),
}

impl SensorMethod {
    /// Clase de valor que produce la lectura.
    pub fn kind(self) -> ValueKind {
        match self {
            SensorMethod::Fixed(sensor) => sensor.kind(),
            SensorMethod::ByColor(_) => ValueKind::Boolean,
        }
    }

    /// Cantidad de argumentos que toma el método.
    pub fn arity(self) -> usize {
        match self {
            SensorMethod::Fixed(_) => 0,
            SensorMethod::ByColor(_) => 1,
        }
    }

    /// Elige el sensor que corresponde a un color, si este se puede detectar.
    pub fn select(self, color: Color) -> Option<Sensor> {
        match self {
            SensorMethod::Fixed(_) => None,
            SensorMethod::ByColor(choices) => choices
                .iter()
                .find(|&&(choice, _)| choice == color)
                .map(|&(_, sensor)| sensor),
        }
    }
}

const DETECTABLE_COLORS: &[(Color, Sensor)] = &[
    (Color::Red,    Sensor::COLOR_RED),
    (Color::Green,  Sensor::COLOR_GREEN),
    (Color::Blue,   Sensor::COLOR_BLUE),
    (Color::Yellow, Sensor::COLOR_YELLOW),
    (Color::White,  Sensor::COLOR_WHITE),
    (Color::Black,  Sensor::COLOR_BLACK),
];

const SENSORS: &[(Receiver, &str, SensorMethod)] = {
    use {Receiver::*, SensorMethod::*};

    &[
        // Orientación
        (Imu, "getPitch", Fixed(Sensor::PITCH)),
        (Imu, "getRoll",  Fixed(Sensor::ROLL)),
        (Imu, "getYaw",   Fixed(Sensor::YAW)),

        // Acelerómetro
        (Imu, "getXAccel",         Fixed(Sensor::ACCEL_X)),
        (Imu, "getYAccel",         Fixed(Sensor::ACCEL_Y)),
        (Imu, "getZAccel",         Fixed(Sensor::ACCEL_Z)),
        (Imu, "getAccelMagnitude", Fixed(Sensor::ACCEL_MAGNITUDE)),

        // Giroscopio
        (Imu, "getXRotationRate", Fixed(Sensor::GYRO_X)),
        (Imu, "getYRotationRate", Fixed(Sensor::GYRO_Y)),
        (Imu, "getZRotationRate", Fixed(Sensor::GYRO_Z)),

        // Magnetómetro
        (Imu, "getMagneticFieldX", Fixed(Sensor::MAG_X)),
        (Imu, "getMagneticFieldY", Fixed(Sensor::MAG_Y)),
        (Imu, "getMagneticFieldZ", Fixed(Sensor::MAG_Z)),

        // Proximidad y distancia
        (LeftDistanceSensor,  "is_object_near", Fixed(Sensor::LEFT_PROXIMITY)),
        (RightDistanceSensor, "is_object_near", Fixed(Sensor::RIGHT_PROXIMITY)),
        (FrontDistanceSensor, "get_distance",   Fixed(Sensor::FRONT_DISTANCE)),

        // Detección de color
        (ColorSensor, "is_object", ByColor(DETECTABLE_COLORS)),
    ]
};

/// Busca el método de sensor para un par `(objeto, método)`.
pub fn resolve_sensor(object: &str, method: &str) -> Result<SensorMethod, LookupError> {
    let receiver = Receiver::from_name(object);

    SENSORS
        .iter()
        .find(|&&(known, name, _)| Some(known) == receiver && name == method)
        .map(|&(_, _, sensor)| sensor)
        .ok_or_else(|| unknown_sensor(object, method))
}

/// Construye el error de búsqueda de sensor.
pub fn unknown_sensor(object: &str, method: &str) -> LookupError {
    LookupError::UnknownSensorMethod {
        receiver: object.to_owned(),
        method: method.to_owned(),
    }
}

/// LED individual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Led {
    Left,
    Right,
}

impl Led {
    /// Código de LED en `SET_LED`.
    pub fn code(self) -> u16 {
        match self {
            Led::Left => 0,
            Led::Right => 1,
        }
    }
}

/// Un comando que se puede emitir hacia el robot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Actuator {
    SetAllLeds,
    TurnOffAllLeds,
    SetLed(Led),
    PlayTune,
    PlayTone,
    StopSound,
}

/// Forma esperada de un argumento de actuador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parameter {
    /// Nombre de color, se expande a un triplete RGB.
    Color,

    /// Nombre de melodía.
    Tune,

    /// Número, truncado a entero dentro de `[0, max]`.
    Number { max: Operand },
}

impl Display for Parameter {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Color => fmt.write_str("color name"),
            Parameter::Tune => fmt.write_str("tune name"),
            Parameter::Number { max } => write!(fmt, "number in [0, {}]", max),
        }
    }
}

impl Actuator {
    /// Instrucción que implementa al actuador.
    pub fn opcode(self) -> Opcode {
        match self {
            Actuator::SetAllLeds | Actuator::TurnOffAllLeds => Opcode::SetAllLeds,
            Actuator::SetLed(_) => Opcode::SetLed,
            Actuator::PlayTune => Opcode::PlayTune,
            Actuator::PlayTone => Opcode::PlayTone,
            Actuator::StopSound => Opcode::StopSound,
        }
    }

    /// Argumentos que espera el actuador, en orden.
    pub fn parameters(self) -> &'static [Parameter] {
        const FREQUENCY: Parameter = Parameter::Number { max: 20_000 };
        const DURATION: Parameter = Parameter::Number { max: 0x7fff };

        match self {
            Actuator::SetAllLeds | Actuator::SetLed(_) => &[Parameter::Color],
            Actuator::PlayTune => &[Parameter::Tune],
            Actuator::PlayTone => &[FREQUENCY, DURATION],
            Actuator::TurnOffAllLeds | Actuator::StopSound => &[],
        }
    }
}

const ACTUATORS: &[(Receiver, &str, Actuator)] = {
    use {Actuator::*, Receiver::*};

    &[
        (AllLeds,  "set_color", SetAllLeds),
        (AllLeds,  "turn_off",  TurnOffAllLeds),
        (LeftLed,  "set_color", SetLed(Led::Left)),
        (RightLed, "set_color", SetLed(Led::Right)),
        (Speaker,  "play_tune", PlayTune),
        (Speaker,  "play_tone", PlayTone),
        (Speaker,  "stop",      StopSound),
    ]
};

/// Busca el actuador para un par `(objeto, método)`.
pub fn resolve_actuator(object: &str, method: &str) -> Result<Actuator, LookupError> {
    let receiver = Receiver::from_name(object);

    ACTUATORS
        .iter()
        .find(|&&(known, name, _)| Some(known) == receiver && name == method)
        .map(|&(_, _, actuator)| actuator)
        .ok_or_else(|| LookupError::UnknownActuatorMethod {
            receiver: object.to_owned(),
            method: method.to_owned(),
        })
}

impl Color {
    /// Triplete RGB que el firmware aplica a los LEDs.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Color::Red     => [255, 0, 0],
            Color::Green   => [0, 255, 0],
            Color::Blue    => [0, 0, 255],
            Color::Yellow  => [255, 255, 0],
            Color::White   => [255, 255, 255],
            Color::Black   => [0, 0, 0],
            Color::Cyan    => [0, 255, 255],
            Color::Magenta => [255, 0, 255],
            Color::Orange  => [255, 165, 0],
            Color::Purple  => [128, 0, 128],
        }
    }
}

impl Tune {
    /// Identificador de melodía en `PLAY_TUNE`.
    pub fn id(self) -> u16 {
        match self {
            Tune::Beep  => 0,
            Tune::Happy => 1,
            Tune::Sad   => 2,
            Tune::Alarm => 3,
            Tune::Chime => 4,
            Tune::Siren => 5,
        }
    }

    /// Búsqueda inversa a partir de un identificador.
    pub fn from_id(id: Operand) -> Option<Self> {
        use Tune::*;

        [Beep, Happy, Sad, Alarm, Chime, Siren]
            .into_iter()
            .find(|tune| Operand::from(tune.id()) == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixed(object: &str, method: &str) -> Sensor {
        match resolve_sensor(object, method) {
            Ok(SensorMethod::Fixed(sensor)) => sensor,
            other => panic!("{}.{} resolved to {:?}", object, method, other),
        }
    }

    #[test]
    fn every_family_resolves() {
        assert_eq!(fixed("imu", "getPitch"), Sensor::PITCH);
        assert_eq!(fixed("imu", "getAccelMagnitude"), Sensor::ACCEL_MAGNITUDE);
        assert_eq!(fixed("imu", "getYRotationRate"), Sensor::GYRO_Y);
        assert_eq!(fixed("imu", "getMagneticFieldZ"), Sensor::MAG_Z);
        assert_eq!(fixed("left_distance_sensor", "is_object_near"), Sensor::LEFT_PROXIMITY);
        assert_eq!(fixed("right_distance_sensor", "is_object_near"), Sensor::RIGHT_PROXIMITY);
        assert_eq!(fixed("front_distance_sensor", "get_distance"), Sensor::FRONT_DISTANCE);
    }

    #[test]
    fn color_literal_selects_sensor() {
        let method = resolve_sensor("color_sensor", "is_object").unwrap();
        assert_eq!(method.select(Color::Blue), Some(Sensor::COLOR_BLUE));
        assert_eq!(method.select(Color::Yellow), Some(Sensor::COLOR_YELLOW));
        assert_eq!(method.select(Color::Purple), None);

        assert_eq!(method.kind(), ValueKind::Boolean);
        assert_eq!(method.arity(), 1);
        assert_eq!(SensorMethod::Fixed(Sensor::YAW).arity(), 0);
    }

    #[test]
    fn unknown_methods_and_receivers_fail_the_same_way() {
        let unknown_method = resolve_sensor("imu", "getNonExistent").unwrap_err();
        let unknown_object = resolve_sensor("gps", "getPitch").unwrap_err();

        assert!(matches!(unknown_method, LookupError::UnknownSensorMethod { .. }));
        assert!(matches!(unknown_object, LookupError::UnknownSensorMethod { .. }));

        // Un método de otro receptor no se comparte
        assert!(resolve_sensor("left_distance_sensor", "get_distance").is_err());
    }

    #[test]
    fn actuators_resolve() {
        assert_eq!(resolve_actuator("all_leds", "set_color"), Ok(Actuator::SetAllLeds));
        assert_eq!(resolve_actuator("right_led", "set_color"), Ok(Actuator::SetLed(Led::Right)));
        assert_eq!(resolve_actuator("speaker", "play_tone"), Ok(Actuator::PlayTone));

        let error = resolve_actuator("all_leds", "blink").unwrap_err();
        assert_eq!(error.to_string(), "Unknown actuator method `all_leds.blink`");
    }

    #[test]
    fn sensor_codes_are_unique_and_reversible() {
        let codes: HashSet<_> = Sensor::ALL.iter().map(|sensor| sensor.code()).collect();
        assert_eq!(codes.len(), Sensor::ALL.len());

        for &sensor in Sensor::ALL {
            assert_eq!(Sensor::from_code(Operand::from(sensor.code())), Some(sensor));
        }
    }

    #[test]
    fn receiver_categories() {
        assert!(Receiver::from_name("imu").unwrap().is_sensor());
        assert!(!Receiver::from_name("speaker").unwrap().is_sensor());
        assert_eq!(Receiver::from_name("IMU"), None);
    }
}
