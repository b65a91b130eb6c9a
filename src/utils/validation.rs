use validator::{Validate, ValidationError, ValidationErrors};

/// Runs the derived validators and reports only the first failing field,
/// walking `order` so that the reported field is stable across runs.
pub fn first_invalid_field<T: Validate>(
    payload: &T,
    order: &[&'static str],
) -> Result<(), (&'static str, ValidationError)> {
    match payload.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(pick_first(&errors, order)),
    }
}

fn pick_first(errors: &ValidationErrors, order: &[&'static str]) -> (&'static str, ValidationError) {
    let field_errors = errors.field_errors();
    order
        .iter()
        .find_map(|field| {
            field_errors
                .get(field)
                .and_then(|errs| errs.first())
                .map(|err| (*field, err.clone()))
        })
        .or_else(|| {
            // A field missing from `order` still has to be reported.
            field_errors
                .iter()
                .find_map(|(field, errs)| errs.first().map(|err| (*field, err.clone())))
        })
        .unwrap_or_else(|| ("__all__", ValidationError::new("invalid")))
}
