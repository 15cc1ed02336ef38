//! Mocked registry entrypoints shared by contract tests.
#[cfg(any(test, feature = "std"))]
pub use inner::*;

#[cfg(any(test, feature = "std"))]
mod inner {
    use concordium_std::test_infrastructure::MockFn;
    use concordium_std::*;

    pub fn parse_and_ok_mock<D: Deserial, S>(
        return_value: impl Clone + Serial + 'static,
    ) -> MockFn<S> {
        MockFn::new_v1(move |parameter, _amount, _balance, _state| {
            if D::deserial(&mut Cursor::new(parameter.as_ref())).is_err() {
                return Err(CallContractError::Trap);
            }
            Ok((false, return_value.clone()))
        })
    }

    pub fn parse_and_check_mock<D: Deserial, S>(
        check: impl Fn(&D) -> bool + 'static,
        return_value: impl Clone + Serial + 'static,
    ) -> MockFn<S> {
        MockFn::new_v1(move |parameter, _amount, _balance, _state| {
            match D::deserial(&mut Cursor::new(parameter.as_ref())) {
                Ok(value) if check(&value) => Ok((false, return_value.clone())),
                _ => Err(CallContractError::Trap),
            }
        })
    }

    /// Mocked CIS-1 query entrypoint. `respond` answers the parsed query by writing into the caller's state, the
    /// way the registry does when it invokes the result function. Traps if parsing fails or `respond` returns false.
    pub fn parse_and_callback_mock<D: Deserial, S>(
        respond: impl Fn(&D, &mut S) -> bool + 'static,
    ) -> MockFn<S> {
        MockFn::new_v1(move |parameter, _amount, _balance, state| {
            match D::deserial(&mut Cursor::new(parameter.as_ref())) {
                Ok(value) if respond(&value, state) => Ok((true, ())),
                _ => Err(CallContractError::Trap),
            }
        })
    }

    /// Mocked entrypoint that always traps, as a rejecting registry would.
    pub fn trap_mock<S>() -> MockFn<S> {
        MockFn::new_v1(
            |_parameter, _amount, _balance, _state| -> Result<(bool, ()), CallContractError<()>> {
                Err(CallContractError::Trap)
            },
        )
    }
}
