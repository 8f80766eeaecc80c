#[cfg(test)]
mod value_tests {
    use rox::environment::{self, EnvRef, Environment};
    use rox::token::{Token, TokenType};
    use rox::value::Value;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-7.0).to_string(), "-7");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
    }

    #[test]
    fn test_primitive_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::String("1".to_string()));
        assert_ne!(Value::Nil, Value::Bool(false));
        // IEEE: NaN is not equal to itself.
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_environment_chain() {
        let globals: EnvRef = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner: EnvRef = Environment::with_enclosing(globals.clone()).into_ref();
        inner.borrow_mut().define("b", Value::Number(2.0));

        assert_eq!(inner.borrow().get(&ident("a")).expect("a"), Value::Number(1.0));

        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Bool(true))
            .expect("assign outer");
        assert_eq!(globals.borrow().get_here("a"), Some(Value::Bool(true)));

        let err = inner.borrow().get(&ident("c")).expect_err("undefined");
        assert_eq!(err.to_string(), "Undefined variable 'c'.\n[line 1]");
    }

    #[test]
    fn test_distance_access() {
        let outer: EnvRef = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));

        let middle: EnvRef = Environment::with_enclosing(outer.clone()).into_ref();
        middle.borrow_mut().define("x", Value::Number(2.0));

        let inner: EnvRef = Environment::with_enclosing(middle.clone()).into_ref();

        assert_eq!(
            environment::get_at(&inner, 2, &ident("x")).expect("outer x"),
            Value::Number(1.0)
        );
        assert_eq!(
            environment::get_at(&inner, 1, &ident("x")).expect("middle x"),
            Value::Number(2.0)
        );

        environment::assign_at(&inner, 2, &ident("x"), Value::Nil).expect("assign");
        assert_eq!(outer.borrow().get_here("x"), Some(Value::Nil));
        assert_eq!(middle.borrow().get_here("x"), Some(Value::Number(2.0)));

        assert!(environment::ancestor(&inner, 3).is_none());
        assert!(environment::get_at(&inner, 0, &ident("x")).is_err());
    }
}
