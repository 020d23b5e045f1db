macro_rules! emit {
    ($emitter:expr, $opcode:expr $(, $arg:expr)* $(,)?) => {
        $emitter.push($opcode, $crate::codegen::emit::args(&[$($arg),*]))
    };
}
