use stripe::{
    AttachPaymentMethod, Client, CreateCustomer, Customer, CustomerInvoiceSettings,
    ListCustomers, PaymentMethod, PaymentMethodId,
};

use crate::error::{AppError, Res};

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Returns the first customer registered under `email`, creating one when
/// none exists. The payment method becomes the customer's default for invoices.
pub async fn find_or_create_customer(
    client: &Client,
    email: &str,
    payment_method_id: &str,
) -> Res<Customer> {
    let pm_id = payment_method_id.parse::<PaymentMethodId>().map_err(|e| {
        AppError::BadRequest(format!("Invalid payment method id: {}", e))
    })?;

    let existing = Customer::list(
        client,
        &ListCustomers {
            email: Some(email),
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .map_err(AppError::from)?;

    if let Some(customer) = existing.data.into_iter().next() {
        // new card for a returning customer
        PaymentMethod::attach(
            client,
            &pm_id,
            AttachPaymentMethod {
                customer: customer.id.clone(),
            },
        )
        .await
        .map_err(AppError::from)?;
        return Ok(customer);
    }

    let params = CreateCustomer {
        email: Some(email),
        payment_method: Some(pm_id.clone()),
        invoice_settings: Some(CustomerInvoiceSettings {
            default_payment_method: Some(pm_id.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    Customer::create(client, params)
        .await
        .map_err(AppError::from)
}
