//! The fixed library of IM subroutines embedded at the start of every
//! emitted program. Each block is emitted at most once, so the internal
//! labels stay unique.

pub const NIL_CHECK: &str = "\
LABEL NIL_CHECK
POPS GF@op2
POPS GF@op1
JUMPIFEQ NIL_FOUND GF@op1 nil@nil
JUMPIFEQ NIL_FOUND GF@op2 nil@nil
PUSHS GF@op1
PUSHS GF@op2
RETURN
LABEL NIL_FOUND
EXIT int@8";

pub const CONV_CHECK: &str = "\
LABEL CONV_CHECK
POPS GF@op2
POPS GF@op1
TYPE GF@type1 GF@op1
TYPE GF@type2 GF@op2
JUMPIFEQ TYPES_OK GF@type1 GF@type2
JUMPIFEQ TYPES_OK GF@type1 string@nil
JUMPIFEQ TYPES_OK GF@type2 string@nil
JUMPIFEQ FIRST_OP_INT GF@type1 string@int
JUMPIFEQ SEC_OP_INT GF@type2 string@int
LABEL FIRST_OP_INT
INT2FLOAT GF@op1 GF@op1
JUMP TYPES_OK
LABEL SEC_OP_INT
INT2FLOAT GF@op2 GF@op2
JUMP TYPES_OK
LABEL TYPES_OK
PUSHS GF@op1
PUSHS GF@op2
RETURN";

pub const CONV_TO_FLOAT: &str = "\
LABEL CONV_TO_FLOAT
POPS GF@op2
POPS GF@op1
TYPE GF@type1 GF@op1
TYPE GF@type2 GF@op2
JUMPIFEQ FIRST_OP_INT_conv GF@type1 string@int
JUMPIFEQ SEC_OP_INT_conv GF@type2 string@int
JUMP FLOAT_DONE
LABEL FIRST_OP_INT_conv
INT2FLOAT GF@op1 GF@op1
JUMPIFEQ SEC_OP_INT_conv GF@type2 string@int
JUMP FLOAT_DONE
LABEL SEC_OP_INT_conv
INT2FLOAT GF@op2 GF@op2
JUMP FLOAT_DONE
LABEL FLOAT_DONE
PUSHS GF@op1
PUSHS GF@op2
RETURN";

pub const CONV_TO_INT: &str = "\
LABEL CONV_TO_INT
POPS GF@op2
POPS GF@op1
TYPE GF@type1 GF@op1
TYPE GF@type2 GF@op2
JUMPIFEQ FIRST_OP_FLOAT_conv GF@type1 string@float
JUMPIFEQ SEC_OP_FLOAT_conv GF@type2 string@float
JUMP INT_DONE
LABEL FIRST_OP_FLOAT_conv
FLOAT2INT GF@op1 GF@op1
JUMPIFEQ SEC_OP_FLOAT_conv GF@type2 string@float
JUMP INT_DONE
LABEL SEC_OP_FLOAT_conv
FLOAT2INT GF@op2 GF@op2
JUMP INT_DONE
LABEL INT_DONE
PUSHS GF@op1
PUSHS GF@op2
RETURN";

pub const CHECK_IF_INT: &str = "\
LABEL CHECK_IF_INT
POPS GF@op2
POPS GF@op1
TYPE GF@type1 GF@op1
TYPE GF@type2 GF@op2
JUMPIFEQ FIRST_OP_INT_OK GF@type1 string@int
JUMP WRONG
LABEL FIRST_OP_INT_OK
JUMPIFEQ SEC_OP_INT_OK GF@type2 string@int
JUMP WRONG
LABEL SEC_OP_INT_OK
PUSHS GF@op1
PUSHS GF@op2
RETURN
LABEL WRONG
EXIT int@6";

pub const INT_ZERODIVCHECK: &str = "\
LABEL int_zerodivcheck
POPS GF@op2
JUMPIFEQ $zero_division_int GF@op2 int@0
PUSHS GF@op2
RETURN
LABEL $zero_division_int
EXIT int@9";

pub const FLOAT_ZERODIVCHECK: &str = "\
LABEL float_zerodivcheck
POPS GF@op2
JUMPIFEQ $zero_division_float GF@op2 float@0x0p+0
PUSHS GF@op2
RETURN
LABEL $zero_division_float
EXIT int@9";

pub const EXPONENTIATION: &str = "\
LABEL EXPONENTIATION
POPS GF@exponent
POPS GF@base
TYPE GF@type1 GF@base
TYPE GF@type2 GF@exponent
JUMPIFEQ EXPONENT_INT string@int GF@type2
FLOAT2INT GF@exponent GF@exponent
LABEL EXPONENT_INT
JUMPIFEQ FLOAT_BASE string@float GF@type1
INT2FLOAT GF@base GF@base
LABEL FLOAT_BASE
JUMPIFEQ EXP_ZERO GF@exponent int@0
LT GF@stackresult GF@exponent int@0
JUMPIFEQ POSEXPONENT GF@stackresult bool@false
MUL GF@exponent GF@exponent int@-1
LABEL POSEXPONENT
MOVE GF@result GF@base
SUB GF@exponent GF@exponent int@1
PUSHS GF@result
MOVE GF@loop_iterator int@0
LABEL EXP_LOOP_START
JUMPIFEQ EXP_LOOP_END GF@loop_iterator GF@exponent
PUSHS GF@base
CALL CONV_CHECK
MULS
ADD GF@loop_iterator GF@loop_iterator int@1
JUMP EXP_LOOP_START
LABEL EXP_LOOP_END
JUMPIFEQ EXIT_EXP_LOOP GF@stackresult bool@false
POPS GF@result
PUSHS float@0x1p+0
PUSHS GF@result
DIVS
LABEL EXIT_EXP_LOOP
RETURN
LABEL EXP_ZERO
JUMPIFEQ ZERO_ZERO GF@base float@0x0p+0
MOVE GF@result int@1
PUSHS GF@result
RETURN
LABEL ZERO_ZERO
EXIT int@6";

pub const EVAL_CONDITION: &str = "\
LABEL EVAL_CONDITION
POPS GF@result
TYPE GF@type1 GF@result
JUMPIFEQ IS_FALSE GF@type1 string@nil
JUMPIFEQ IS_BOOL GF@type1 string@bool
JUMP IS_TRUE
LABEL IS_BOOL
JUMPIFEQ IS_FALSE GF@result bool@false
JUMP IS_TRUE
LABEL IS_FALSE
MOVE GF@result bool@false
JUMP END_EVAL_CHECK
LABEL IS_TRUE
MOVE GF@result bool@true
JUMP END_EVAL_CHECK
LABEL END_EVAL_CHECK
PUSHS GF@result
RETURN";

/// Prints the value on top of the stack; a nil prints as the word `nil`.
pub const NIL_WRITE: &str = "\
LABEL nil_write
POPS GF@op1
TYPE GF@type1 GF@op1
JUMPIFEQ IS_NIL string@nil GF@type1
WRITE GF@op1
JUMP END_WRITE
LABEL IS_NIL
WRITE string@nil
LABEL END_WRITE
PUSHS GF@op1
RETURN";

pub const FOR_CONVERT: &str = "\
LABEL FOR_CONVERT
POPS GF@op1
TYPE GF@type1 GF@op1
JUMPIFEQ forFIRST_OP_NIL GF@type1 string@nil
JUMPIFEQ forFIRST_OP_INT_conv GF@type1 string@int
JUMP forFLOAT_DONE
LABEL forFIRST_OP_INT_conv
INT2FLOAT GF@op1 GF@op1
LABEL forFLOAT_DONE
PUSHS GF@op1
RETURN
LABEL forFIRST_OP_NIL
EXIT int@8";

pub const ZERO_STEP: &str = "\
LABEL ZERO_STEP
POPS GF@op1
TYPE GF@type1 GF@op1
JUMPIFEQ stepFIRST_OP_NIL GF@type1 string@nil
JUMPIFEQ stepFIRST_OP_INT_conv GF@type1 string@int
JUMP stepFLOAT_DONE
LABEL stepFIRST_OP_INT_conv
INT2FLOAT GF@op1 GF@op1
LABEL stepFLOAT_DONE
PUSHS GF@op1
JUMPIFEQ step_is_zero GF@op1 float@0x0p+0
RETURN
LABEL step_is_zero
EXIT int@6
LABEL stepFIRST_OP_NIL
EXIT int@7";

/// True when a positive step overshot the bound or a negative step
/// undershot it.
pub const SHOULD_I_JUMP: &str = "\
LABEL SHOULD_I_JUMP
LT GF@result GF@for_step float@0x0p+0
JUMPIFEQ NEG_STEP GF@result bool@true
JUMP POS_STEP
LABEL NEG_STEP
LT GF@result GF@for_iter GF@for_condition
PUSHS GF@result
JUMP SHOULD_I_JUMP_END
LABEL POS_STEP
GT GF@result GF@for_iter GF@for_condition
PUSHS GF@result
LABEL SHOULD_I_JUMP_END
RETURN";

// ---- built-in functions ----

pub const READS: &str = "\
LABEL $reads
PUSHFRAME
DEFVAR LF@retval0
READ LF@retval0 string
POPFRAME
RETURN";

pub const READI: &str = "\
LABEL $readi
PUSHFRAME
DEFVAR LF@retval0
READ LF@retval0 int
POPFRAME
RETURN";

pub const READN: &str = "\
LABEL $readn
PUSHFRAME
DEFVAR LF@retval0
READ LF@retval0 float
POPFRAME
RETURN";

pub const TOINTEGER: &str = "\
LABEL $tointeger
PUSHFRAME
DEFVAR LF@retval0
DEFVAR LF@param0
MOVE LF@param0 LF@%0
JUMPIFNEQ TOINT_GOOD LF@param0 nil@nil
MOVE LF@retval0 nil@nil
POPFRAME
RETURN
LABEL TOINT_GOOD
FLOAT2INT LF@retval0 LF@param0
POPFRAME
RETURN";

pub const CHR: &str = "\
LABEL $chr
PUSHFRAME
DEFVAR LF@retval0
DEFVAR LF@%param0
MOVE LF@%param0 LF@%0
JUMPIFEQ CHR_NIL LF@%param0 nil@nil
GT GF@result LF@%param0 int@255
JUMPIFEQ CHR_OUT GF@result bool@true
LT GF@result LF@%param0 int@0
JUMPIFEQ CHR_OUT GF@result bool@true
JUMP CHR_OK
LABEL CHR_OUT
MOVE LF@retval0 nil@nil
JUMP CHR_END
LABEL CHR_OK
INT2CHAR LF@retval0 LF@%param0
LABEL CHR_END
POPFRAME
RETURN
LABEL CHR_NIL
EXIT int@8";

pub const ORD: &str = "\
LABEL $ord
PUSHFRAME
DEFVAR LF@retval0
DEFVAR LF@%param0
DEFVAR LF@%param1
MOVE LF@%param0 LF@%0
MOVE LF@%param1 LF@%1
JUMPIFEQ ORD_NIL LF@%param0 nil@nil
JUMPIFEQ ORD_NIL LF@%param1 nil@nil
STRLEN GF@trash LF@%param0
GT GF@result LF@%param1 GF@trash
JUMPIFEQ ORD_OUT GF@result bool@true
LT GF@result LF@%param1 int@1
JUMPIFEQ ORD_OUT GF@result bool@true
SUB LF@%param1 LF@%param1 int@1
STRI2INT LF@retval0 LF@%param0 LF@%param1
JUMP ORD_END
LABEL ORD_OUT
MOVE LF@retval0 nil@nil
LABEL ORD_END
POPFRAME
RETURN
LABEL ORD_NIL
EXIT int@8";

pub const SUBSTR: &str = "\
LABEL $substr
PUSHFRAME
DEFVAR LF@retval0
MOVE LF@retval0 string@
DEFVAR LF@%param0
DEFVAR LF@%param1
DEFVAR LF@%param2
DEFVAR LF@iterator
DEFVAR LF@stringend
DEFVAR LF@letter
MOVE LF@%param0 LF@%0
MOVE LF@%param1 LF@%1
MOVE LF@%param2 LF@%2
STRLEN GF@trash LF@%param0
GT GF@result LF@%param1 GF@trash
JUMPIFEQ SUBSTR_OUT GF@result bool@true
LT GF@result LF@%param1 int@1
JUMPIFEQ SUBSTR_OUT GF@result bool@true
GT GF@result LF@%param2 GF@trash
JUMPIFEQ SUBSTR_OUT GF@result bool@true
LT GF@result LF@%param2 int@1
JUMPIFEQ SUBSTR_OUT GF@result bool@true
LT GF@result LF@%param2 LF@%param1
JUMPIFEQ SUBSTR_OUT GF@result bool@true
JUMPIFEQ SUBSTR_NIL LF@%param1 nil@nil
JUMPIFEQ SUBSTR_NIL LF@%param2 nil@nil
MOVE LF@iterator LF@%param1
SUB LF@iterator LF@iterator int@1
MOVE LF@stringend LF@%param2
SUB LF@stringend LF@stringend int@1
LABEL LOOP
GETCHAR LF@letter LF@%param0 LF@iterator
CONCAT LF@retval0 LF@retval0 LF@letter
JUMPIFEQ DONE LF@iterator LF@stringend
ADD LF@iterator LF@iterator int@1
JUMP LOOP
LABEL DONE
POPFRAME
RETURN
LABEL SUBSTR_OUT
MOVE LF@retval0 string@
POPFRAME
RETURN
LABEL SUBSTR_NIL
MOVE LF@retval0 nil@nil
POPFRAME
RETURN";
